//! Connection lifecycle: connect with backoff-and-retry, the post-connect
//! handshake, and graceful disconnect.

use crate::state::TransitState;
use crate::transit::Transit;
use crate::transporter::Transporter;
use serde_json::Value;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

impl<T: Transporter + 'static> Transit<T> {
    /// Invokes the transporter's connect. On failure, retries after the
    /// configured backoff unless a disconnect has been requested in the
    /// meantime. Resolves only once the post-connect handshake reports
    /// connected.
    pub async fn connect(self: &std::sync::Arc<Self>) {
        self.state.set(TransitState::Connecting);
        loop {
            info!(node = %self.self_node, "connecting transporter");
            match self.transporter.connect().await {
                Ok(()) => {
                    self.wait_connected().await;
                    return;
                }
                Err(err) => {
                    if self.is_disconnecting() {
                        return;
                    }
                    warn!(error = %err, "connect failed, retrying");
                    tokio::time::sleep(Duration::from_millis(self.config.backoff.base_ms)).await;
                }
            }
        }
    }

    /// Registers a waiter completed once the handshake declares connected.
    pub async fn wait_connected(&self) {
        if self.state.is_connected() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        self.connect_waiters.lock().await.push(tx);
        let _ = rx.await;
    }

    /// Run once the transporter reports a completed connect. Skips the
    /// subscription barrier on reconnect, since topics remain bound.
    pub(crate) async fn run_post_connect_handshake(self: std::sync::Arc<Self>) {
        let first_connect = !self.barrier.is_open();
        if first_connect {
            self.state.set(TransitState::Subscribing);
            if let Err(err) = self.subscribe_core_topics().await {
                warn!(error = %err, "subscribing core topics failed");
                return;
            }
            self.mark_subscribed();
        }

        self.state.set(TransitState::Handshaking);

        if let Err(err) = self.discover_nodes().await {
            warn!(error = %err, "discoverNodes failed during handshake");
        }
        if let Err(err) = self.send_node_info(None).await {
            warn!(error = %err, "sendNodeInfo failed during handshake");
        }

        tokio::time::sleep(Duration::from_millis(
            self.config.heartbeat.handshake_grace_ms,
        ))
        .await;

        self.state.set(TransitState::Connected);
        self.broker
            .broadcast_local("$transporter.connected", Value::Null, None);

        let mut waiters = self.connect_waiters.lock().await;
        for waiter in waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    async fn subscribe_core_topics(&self) -> Result<(), crate::error::TransitError> {
        for topic in crate::subscription::core_topics(&self.self_node) {
            match topic {
                crate::subscription::Topic::Broadcast(name) => {
                    self.transporter.subscribe(name, None).await?;
                }
                crate::subscription::Topic::Scoped(name, node) => {
                    self.transporter.subscribe(name, Some(&node)).await?;
                }
            }
        }
        Ok(())
    }

    /// Graceful shutdown: marks disconnecting, notifies local listeners,
    /// and tells the peer mesh if the transporter is still up.
    pub async fn disconnect(&self) {
        self.state.set(TransitState::Draining);
        self.disconnecting.store(true, Ordering::Release);
        self.broker.broadcast_local(
            "$transporter.disconnected",
            serde_json::json!({ "graceFul": true }),
            None,
        );

        if self.transporter.connected() {
            if let Err(err) = self.send_disconnect_packet().await {
                warn!(error = %err, "failed to broadcast DISCONNECT");
            }
            if let Err(err) = self.transporter.disconnect().await {
                warn!(error = %err, "transporter disconnect failed");
            }
        }

        self.state.set(TransitState::Disconnected);
    }
}
