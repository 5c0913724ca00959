//! Bytes layer, injected so the wire format is swappable independently of
//! the packet/command model (mirrors the Broker's `serializer.serialize /
//! deserialize` contract).

use crate::error::TransitError;
use crate::packet::Packet;

pub trait Serializer: Send + Sync {
    fn serialize(&self, packet: &Packet) -> Result<Vec<u8>, TransitError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<Packet, TransitError>;
}

/// Default wire format: JSON, the same choice `hooteproto_server.rs` makes
/// for its envelope bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize(&self, packet: &Packet) -> Result<Vec<u8>, TransitError> {
        serde_json::to_vec(packet).map_err(|e| TransitError::DecodeError {
            command: packet.command(),
            message: e.to_string(),
        })
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Packet, TransitError> {
        if bytes.is_empty() {
            return Err(TransitError::MissingPacket);
        }
        serde_json::from_slice(bytes).map_err(|e| TransitError::DecodeError {
            command: crate::command::Command::Event,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;
    use crate::packet::{Payload, PingPayload};

    #[test]
    fn round_trips_a_ping_packet() {
        let packet = Packet::new(NodeId::new("node-a"), Payload::Ping(PingPayload { time: 1000 }));
        let ser = JsonSerializer;
        let bytes = ser.serialize(&packet).unwrap();
        let decoded = ser.deserialize(&bytes).unwrap();
        assert_eq!(packet, decoded);
    }

    #[test]
    fn empty_bytes_is_missing_packet() {
        let ser = JsonSerializer;
        assert!(matches!(
            ser.deserialize(&[]),
            Err(TransitError::MissingPacket)
        ));
    }
}
