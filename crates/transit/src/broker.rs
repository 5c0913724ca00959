//! The broker contract: everything Transit needs from the owning service
//! layer, kept out of this crate the same way `hooteproto::client` keeps
//! business logic out of the reactor task.

use crate::error::RemoteFailure;
use crate::node::NodeId;
use crate::packet::RequestPayload;
use async_trait::async_trait;
use serde_json::Value;

/// A caller context reconstructed from an inbound REQUEST's payload.
/// Transit passes the wire payload through verbatim; recreating a richer
/// context object is the broker's responsibility.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub id: String,
    pub action: String,
    pub params: Value,
    pub meta: Value,
    pub node_id: NodeId,
}

/// Builds a `CallerContext` from a decoded REQUEST payload.
pub trait ContextFactory: Send + Sync {
    fn create_from_payload(&self, sender: NodeId, payload: &RequestPayload) -> CallerContext;
}

/// Copies the REQUEST payload's fields straight across. Sufficient unless a
/// host wants to enrich the context with something beyond the wire payload
/// (tracing span, auth principal, …), the same way `JsonSerializer` is the
/// default `Serializer` until a caller needs something else.
pub struct DefaultContextFactory;

impl ContextFactory for DefaultContextFactory {
    fn create_from_payload(&self, sender: NodeId, payload: &RequestPayload) -> CallerContext {
        CallerContext {
            id: payload.id.clone(),
            action: payload.action.clone(),
            params: payload.params.clone(),
            meta: payload.meta.clone(),
            node_id: sender,
        }
    }
}

#[async_trait]
pub trait Broker: Send + Sync {
    fn node_id(&self) -> &NodeId;

    /// Broadcasts a local (non-wire) lifecycle event, e.g.
    /// `$transporter.connected`, `$node.pong`.
    fn broadcast_local(&self, name: &str, data: Value, sender: Option<&NodeId>);

    /// Executes a locally-registered action on behalf of a remote caller.
    async fn handle_remote_request(
        &self,
        ctx: CallerContext,
    ) -> Result<Value, RemoteFailure>;

    /// Delivers an inbound EVENT to local service handlers.
    fn emit_local_services(&self, event: &str, data: Value, groups: &[String], sender: &NodeId);

    /// This node's own descriptor, published via `INFO`.
    fn local_node_info(&self) -> Value;

    /// Resolves which groups should receive a broadcast event when the
    /// caller didn't specify any.
    fn event_groups(&self, event: &str) -> Vec<String>;
}

/// Peer bookkeeping, fed by the dispatcher's INFO/DISCONNECT/HEARTBEAT
/// handlers. Ownership of node state lives outside this crate; Transit
/// only forwards what it decodes off the wire.
pub trait Registry: Send + Sync {
    fn process_node_info(&self, sender: &NodeId, info: &Value);
    fn node_disconnected(&self, sender: &NodeId);
    fn node_heartbeat(&self, sender: &NodeId, cpu: f64);
}
