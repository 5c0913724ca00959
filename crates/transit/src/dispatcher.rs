//! Inbound message handling: decode, filter, route.
//!
//! Generalizes `HooteprotoServer::handle_message`'s single dispatch table
//! into the nine-command set, adding the protocol-version and self-echo
//! filters that sit in front of the command switch.

use crate::command::Command;
use crate::error::{RemoteFailure, TransitError};
use crate::node::NodeId;
use crate::packet::{Packet, Payload, PongPayload, ResponsePayload};
use crate::transit::Transit;
use crate::transporter::Transporter;
use serde_json::Value;
use tracing::{debug, warn};

impl<T: Transporter + 'static> Transit<T> {
    /// Entry point fed by the transporter's inbound callback. Every error
    /// is logged and swallowed here: no handler exception escapes
    /// `on_message`, since doing so would tear down the inbound stream.
    pub async fn on_message(&self, bytes: Vec<u8>) {
        if bytes.is_empty() {
            warn!("dropping empty inbound packet");
            return;
        }

        let packet = match self.serializer.deserialize(&bytes) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(error = %err, "dropping undecodable inbound packet");
                return;
            }
        };

        self.stats.record_received();

        if packet.ver != self.config.protocol_version {
            warn!(
                sender = %packet.sender,
                expected = %self.config.protocol_version,
                observed = %packet.ver,
                "dropping packet with mismatched protocol version"
            );
            return;
        }

        let is_self_echo = packet.sender == self.self_node;
        let command = packet.command();
        if is_self_echo && !matches!(command, Command::Event | Command::Request | Command::Response)
        {
            debug!(?command, "dropping self-echo of non-passthrough command");
            return;
        }

        if let Err(err) = self.dispatch(packet).await {
            warn!(error = %err, ?command, "inbound handler failed");
        }
    }

    async fn dispatch(&self, packet: Packet) -> Result<(), TransitError> {
        let sender = packet.sender.clone();
        match packet.payload {
            Payload::Request(payload) => self.handle_request(sender, payload).await,
            Payload::Response(payload) => {
                self.handle_response(sender, payload).await;
                Ok(())
            }
            Payload::Event(payload) => {
                let groups = payload.groups.unwrap_or_default();
                self.broker
                    .emit_local_services(&payload.event, payload.data, &groups, &sender);
                Ok(())
            }
            Payload::Discover => self.send_node_info(Some(sender)).await,
            Payload::Info(info) => {
                let descriptor = serde_json::to_value(&info).unwrap_or(Value::Null);
                self.registry.process_node_info(&sender, &descriptor);
                Ok(())
            }
            Payload::Disconnect => {
                self.registry.node_disconnected(&sender);
                self.pending.cancel_by_node(&sender).await;
                Ok(())
            }
            Payload::Heartbeat(hb) => {
                self.registry.node_heartbeat(&sender, hb.cpu);
                Ok(())
            }
            Payload::Ping(ping) => self.handle_ping(sender, ping.time).await,
            Payload::Pong(pong) => {
                self.handle_pong(sender, pong);
                Ok(())
            }
        }
    }

    async fn handle_request(
        &self,
        sender: NodeId,
        payload: crate::packet::RequestPayload,
    ) -> Result<(), TransitError> {
        let id = payload.id.clone();
        let ctx = self.context_factory.create_from_payload(sender.clone(), &payload);
        match self.broker.handle_remote_request(ctx).await {
            Ok(data) => self.send_response(&sender, &id, Some(data), None).await,
            Err(failure) => self.send_response(&sender, &id, None, Some(failure)).await,
        }
    }

    async fn handle_response(&self, sender: NodeId, payload: ResponsePayload) {
        let outcome = if payload.success {
            Ok(payload.data.unwrap_or(Value::Null))
        } else {
            let envelope = payload.error.unwrap_or(crate::packet::ErrorEnvelope {
                name: "Error".to_string(),
                message: "unknown remote error".to_string(),
                code: None,
                error_type: None,
                node_id: Some(sender.clone()),
                data: None,
                stack: None,
            });
            Err(RemoteFailure::from_envelope(envelope, sender))
        };
        self.pending.complete(&payload.id, outcome).await;
    }

    async fn handle_ping(&self, sender: NodeId, time: i64) -> Result<(), TransitError> {
        let arrived = self.clock.now_ms();
        let packet = self.build_packet(Payload::Pong(PongPayload { time, arrived }));
        self.publish_to(&sender, packet).await
    }

    fn handle_pong(&self, sender: NodeId, pong: PongPayload) {
        let t2 = self.clock.now_ms();
        let result = crate::liveness::compute_pong(sender.clone(), pong.time, pong.arrived, t2);
        let data = serde_json::to_value(&result).unwrap_or(Value::Null);
        self.broker.broadcast_local("$node.pong", data, Some(&sender));
    }
}
