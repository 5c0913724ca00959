//! Typed outbound helpers. Each builds the corresponding packet and routes
//! it through `publish`, which gates on the subscription barrier before
//! handing bytes to the transporter.

use crate::error::{RemoteFailure, TransitError};
use crate::node::NodeId;
use crate::packet::{
    ErrorEnvelope, EventPayload, HeartbeatPayload, Packet, PingPayload, RequestPayload,
    ResponsePayload,
};
use crate::packet::Payload;
use crate::pending::RequestOutcome;
use crate::transit::Transit;
use crate::transporter::Transporter;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Parameters for an outbound call. Mirrors the wire `REQUEST` fields the
/// caller controls; `id` is generated by `request` itself.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub node_id: NodeId,
    pub action: String,
    pub params: Value,
    pub meta: Value,
    pub timeout: Option<u64>,
    pub level: Option<u32>,
    pub metrics: Option<bool>,
    pub parent_id: Option<String>,
    pub request_id: Option<String>,
}

impl<T: Transporter + 'static> Transit<T> {
    /// Builds a broadcast packet stamped with this node's configured
    /// protocol version, rather than `Packet::new`'s hardcoded default.
    pub(crate) fn build_packet(&self, payload: Payload) -> Packet {
        let mut packet = Packet::new(self.self_node.clone(), payload);
        packet.ver = self.config.protocol_version.clone();
        packet
    }

    /// Publishes a packet, deferring behind the subscription barrier if it
    /// hasn't opened yet, then counting it as sent.
    pub(crate) async fn publish(&self, packet: Packet) -> Result<(), TransitError> {
        self.barrier.wait().await;
        self.transporter.prepublish(&packet).await?;
        self.stats.record_sent();
        Ok(())
    }

    /// Stamps `packet.target` with the destination before publishing, so
    /// the transporter can route it (e.g. `RESPONSE@<node_id>`) instead of
    /// broadcasting it.
    pub(crate) async fn publish_to(
        &self,
        node_id: &NodeId,
        mut packet: Packet,
    ) -> Result<(), TransitError> {
        packet.target = Some(node_id.clone());
        self.publish(packet).await
    }

    /// Enforces the `maxQueueSize` gate, registers a pending completion,
    /// and publishes the `REQUEST`. Timeout is not owned here — the caller
    /// races this against its own deadline.
    pub async fn request(&self, call: CallRequest) -> Result<RequestOutcome, TransitError> {
        let id = Uuid::new_v4().to_string();
        let rx = self
            .pending
            .insert(id.clone(), call.node_id.clone(), call.action.clone())
            .await?;

        let payload = RequestPayload {
            id: id.clone(),
            action: call.action,
            params: call.params,
            meta: call.meta,
            timeout: call.timeout,
            level: call.level,
            metrics: call.metrics,
            parent_id: call.parent_id,
            request_id: call.request_id,
        };
        let packet = self.build_packet(Payload::Request(payload));
        self.publish_to(&call.node_id, packet).await?;

        Ok(rx.await.unwrap_or_else(|_| {
            Err(RemoteFailure {
                name: "RequestRejectedError".to_string(),
                message: format!("Request is rejected (NodeID: {})", call.node_id),
                code: Some(502),
                error_type: None,
                node_id: call.node_id,
                data: None,
                stack: None,
            })
        }))
    }

    pub async fn send_response(
        &self,
        node_id: &NodeId,
        id: &str,
        data: Option<Value>,
        error: Option<RemoteFailure>,
    ) -> Result<(), TransitError> {
        let payload = ResponsePayload {
            id: id.to_string(),
            success: error.is_none(),
            data,
            error: error.map(|failure| ErrorEnvelope {
                name: failure.name,
                message: failure.message,
                code: failure.code,
                error_type: failure.error_type,
                node_id: Some(failure.node_id),
                data: failure.data,
                stack: failure.stack,
            }),
        };
        let packet = self.build_packet(Payload::Response(payload));
        self.publish_to(node_id, packet).await
    }

    pub async fn send_event(
        &self,
        node_id: &NodeId,
        name: &str,
        data: Value,
    ) -> Result<(), TransitError> {
        let payload = EventPayload {
            event: name.to_string(),
            data,
            groups: None,
        };
        let packet = self.build_packet(Payload::Event(payload));
        self.publish_to(node_id, packet).await
    }

    /// Publishes one unicast `EVENT` per `(node_id -> groups)` pair; the
    /// receiving peer filters locally by its own group membership.
    pub async fn send_balanced_event(
        &self,
        name: &str,
        data: Value,
        node_groups: HashMap<NodeId, Vec<String>>,
    ) -> Result<(), TransitError> {
        for (node_id, groups) in node_groups {
            let payload = EventPayload {
                event: name.to_string(),
                data: data.clone(),
                groups: Some(groups),
            };
            let packet = self.build_packet(Payload::Event(payload));
            self.publish_to(&node_id, packet).await?;
        }
        Ok(())
    }

    /// Broadcast-style event. Resolves `groups` via the broker when empty;
    /// a still-empty resolution is a no-op.
    pub async fn send_event_to_groups(
        &self,
        name: &str,
        data: Value,
        groups: Vec<String>,
    ) -> Result<(), TransitError> {
        let groups = if groups.is_empty() {
            self.broker.event_groups(name)
        } else {
            groups
        };
        if groups.is_empty() {
            return Ok(());
        }
        let payload = EventPayload {
            event: name.to_string(),
            data,
            groups: Some(groups),
        };
        let packet = self.build_packet(Payload::Event(payload));
        self.publish(packet).await
    }

    pub async fn discover_nodes(&self) -> Result<(), TransitError> {
        let packet = self.build_packet(Payload::Discover);
        self.publish(packet).await
    }

    pub async fn discover_node(&self, node_id: &NodeId) -> Result<(), TransitError> {
        let packet = self.build_packet(Payload::Discover);
        self.publish_to(node_id, packet).await
    }

    /// Publishes local `INFO`. When `node_id` is absent this is the
    /// broadcast form, which first triggers the transporter's
    /// service-specific subscription hook.
    pub async fn send_node_info(&self, node_id: Option<NodeId>) -> Result<(), TransitError> {
        if node_id.is_none() {
            self.transporter.make_service_specific_subscriptions().await?;
        }
        let info = self.broker.local_node_info();
        let descriptor: crate::packet::InfoPayload =
            serde_json::from_value(info).map_err(|e| TransitError::DecodeError {
                command: crate::command::Command::Info,
                message: e.to_string(),
            })?;
        let packet = self.build_packet(Payload::Info(descriptor));
        match node_id {
            Some(node_id) => self.publish_to(&node_id, packet).await,
            None => self.publish(packet).await,
        }
    }

    pub async fn send_ping(&self, node_id: Option<NodeId>) -> Result<(), TransitError> {
        let payload = PingPayload {
            time: self.clock.now_ms(),
        };
        let packet = self.build_packet(Payload::Ping(payload));
        match node_id {
            Some(node_id) => self.publish_to(&node_id, packet).await,
            None => self.publish(packet).await,
        }
    }

    pub async fn send_heartbeat(&self, cpu: f64) -> Result<(), TransitError> {
        let packet = self.build_packet(Payload::Heartbeat(HeartbeatPayload { cpu }));
        self.publish(packet).await
    }

    pub async fn send_disconnect_packet(&self) -> Result<(), TransitError> {
        let packet = self.build_packet(Payload::Disconnect);
        self.publish(packet).await
    }
}
