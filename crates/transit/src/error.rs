//! Typed errors for the transit layer.
//!
//! One `thiserror` enum with named, structured variants — never a
//! stringly-typed error for something a caller might want to match on.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to outbound callers, or logged and dropped on the
/// inbound path (never both).
#[derive(Debug, Error)]
pub enum TransitError {
    /// Inbound bytes were null/empty.
    #[error("missing packet bytes")]
    MissingPacket,

    /// Decode yielded no payload.
    #[error("missing payload for command {command:?}")]
    MissingPayload { command: crate::command::Command },

    /// Decoded payload's shape didn't match its command.
    #[error("failed to decode {command:?} payload: {message}")]
    DecodeError {
        command: crate::command::Command,
        message: String,
    },

    /// `ver` tag didn't match the configured protocol version.
    #[error("protocol version mismatch from {sender}: expected {expected}, got {observed}")]
    ProtocolVersionMismatch {
        sender: NodeId,
        expected: String,
        observed: String,
    },

    /// Outbound request would exceed `maxQueueSize`.
    #[error("queue full: action {action} targeting {node:?}, size {size} >= limit {limit}")]
    QueueFull {
        action: String,
        node: Option<NodeId>,
        size: usize,
        limit: usize,
    },

    /// Pending call aborted because its target peer disconnected.
    #[error("request rejected: action {action} targeting {node} was aborted by peer disconnect")]
    RequestRejected { action: String, node: NodeId },

    /// Error envelope reconstructed from a peer's RESPONSE.
    #[error("{message} (NodeID: {node_id})")]
    RemoteFailure(#[from] RemoteFailure),
}

/// A peer-originated error, reconstructed from a RESPONSE's `error` field.
/// Preserves every field the wire format carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Error)]
#[error("{message}")]
pub struct RemoteFailure {
    pub name: String,
    /// Message already suffixed with `(NodeID: <sender>)` by the dispatcher.
    pub message: String,
    pub code: Option<i64>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub node_id: NodeId,
    pub data: Option<serde_json::Value>,
    pub stack: Option<String>,
}

impl RemoteFailure {
    /// Build from the wire-level `ErrorEnvelope`, suffixing the message with
    /// the sending node id.
    pub fn from_envelope(envelope: crate::packet::ErrorEnvelope, sender: NodeId) -> Self {
        Self {
            name: envelope.name,
            message: format!("{} (NodeID: {})", envelope.message, sender),
            code: envelope.code,
            error_type: envelope.error_type,
            node_id: sender,
            data: envelope.data,
            stack: envelope.stack,
        }
    }
}
