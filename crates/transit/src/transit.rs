//! The glue type: wires the pending table, stats, state, dispatcher,
//! outbound API and lifecycle controller around a concrete transporter.

use crate::broker::{Broker, ContextFactory, Registry};
use crate::clock::Clock;
use crate::node::NodeId;
use crate::pending::PendingTable;
use crate::serializer::Serializer;
use crate::state::StateCell;
use crate::stats::TransitStats;
use crate::subscription::SubscriptionBarrier;
use crate::transporter::{OnConnect, OnMessage, Transporter};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Weak};
use tokio::sync::{oneshot, Mutex};
use transit_config::TransitConfig;

pub struct Transit<T: Transporter> {
    pub(crate) self_node: NodeId,
    pub(crate) transporter: Arc<T>,
    pub(crate) broker: Arc<dyn Broker>,
    pub(crate) registry: Arc<dyn Registry>,
    pub(crate) context_factory: Arc<dyn ContextFactory>,
    pub(crate) serializer: Arc<dyn Serializer>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) pending: PendingTable,
    pub(crate) stats: TransitStats,
    pub(crate) state: StateCell,
    pub(crate) barrier: SubscriptionBarrier,
    pub(crate) config: TransitConfig,
    pub(crate) disconnecting: AtomicBool,
    pub(crate) connect_waiters: Mutex<Vec<oneshot::Sender<()>>>,
}

impl<T: Transporter + 'static> Transit<T> {
    pub fn new(
        self_node: NodeId,
        transporter: T,
        broker: Arc<dyn Broker>,
        registry: Arc<dyn Registry>,
        context_factory: Arc<dyn ContextFactory>,
        serializer: Arc<dyn Serializer>,
        clock: Arc<dyn Clock>,
        config: TransitConfig,
    ) -> Arc<Self> {
        let transit = Arc::new(Self {
            self_node,
            transporter: Arc::new(transporter),
            broker,
            registry,
            context_factory,
            serializer,
            clock,
            pending: PendingTable::new(config.max_queue_size),
            stats: TransitStats::new(),
            state: StateCell::default(),
            barrier: SubscriptionBarrier::new(),
            config,
            disconnecting: AtomicBool::new(false),
            connect_waiters: Mutex::new(Vec::new()),
        });

        let on_message: OnMessage = {
            let weak: Weak<Self> = Arc::downgrade(&transit);
            Box::new(move |bytes| {
                if let Some(transit) = weak.upgrade() {
                    tokio::spawn(async move {
                        transit.on_message(bytes).await;
                    });
                }
            })
        };
        let on_connect: OnConnect = {
            let weak: Weak<Self> = Arc::downgrade(&transit);
            Box::new(move || {
                if let Some(transit) = weak.upgrade() {
                    tokio::spawn(async move {
                        transit.run_post_connect_handshake().await;
                    });
                }
            })
        };
        transit.transporter.init(on_message, on_connect);

        transit
    }

    pub fn self_node(&self) -> &NodeId {
        &self.self_node
    }

    pub fn stats(&self) -> &TransitStats {
        &self.stats
    }

    pub fn state(&self) -> crate::state::TransitState {
        self.state.get()
    }

    pub fn is_disconnecting(&self) -> bool {
        self.disconnecting.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Access to the underlying transporter, e.g. for transport-specific
    /// metrics or health reporting the caller layers on top.
    pub fn transporter(&self) -> &T {
        &self.transporter
    }

    /// Opens the subscription barrier directly, releasing any outbound
    /// publish deferred behind it. Normally opened only once the
    /// subscription step of the post-connect handshake succeeds; exposed
    /// so callers driving the dispatcher/outbound API without a full
    /// lifecycle (e.g. tests) can skip straight to "subscribed".
    pub fn mark_subscribed(&self) {
        self.barrier.open();
    }
}
