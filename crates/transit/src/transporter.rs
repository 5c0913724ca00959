//! The transporter contract: the only seam Transit has onto an actual
//! socket/transport implementation. No concrete transporter (ZMQ, NATS, …)
//! ships in this crate — callers bring their own, the way `hooteproto`
//! callers bring their own `rzmq`-backed `DealerSocket`.

use crate::error::TransitError;
use crate::node::NodeId;
use crate::packet::Packet;
use async_trait::async_trait;

/// Bound once at startup; delivers inbound bytes to Transit's dispatcher.
pub type OnMessage = Box<dyn Fn(Vec<u8>) + Send + Sync>;

/// Bound once at startup; notified when the transporter completes a
/// connect (used to kick off the post-connect handshake).
pub type OnConnect = Box<dyn Fn() + Send + Sync>;

#[async_trait]
pub trait Transporter: Send + Sync {
    /// Binds the inbound-message and on-connect callbacks. Called once,
    /// before `connect`. Takes `&self` rather than `&mut self` so the
    /// transporter can live behind a shared `Arc`; implementations store
    /// the callbacks behind interior mutability (the same way
    /// `HootClient`'s reactor task owns its mutable state internally).
    fn init(&self, on_message: OnMessage, on_connect: OnConnect);

    async fn connect(&self) -> Result<(), TransitError>;

    async fn disconnect(&self) -> Result<(), TransitError>;

    fn connected(&self) -> bool;

    /// Subscribes to a single topic, optionally scoped to a node id.
    async fn subscribe(&self, topic: &str, node_id: Option<&NodeId>) -> Result<(), TransitError>;

    /// Serializes and sends a packet. `packet.target` names the peer to
    /// route a unicast command to (e.g. `RESPONSE@<target>`); `None` means
    /// broadcast on the command's bare topic.
    async fn prepublish(&self, packet: &Packet) -> Result<(), TransitError>;

    /// Invoked once, before the first broadcast `INFO`, so that
    /// service-specific topics are live before peers learn about them.
    async fn make_service_specific_subscriptions(&self) -> Result<(), TransitError>;
}
