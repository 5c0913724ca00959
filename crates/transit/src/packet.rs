//! Wire packet shapes and the codec that maps commands to them.
//!
//! Generalizes `hooteproto::frame::HootFrame`'s command-table ownership: the
//! codec owns the `ver` tag and the command→payload mapping, and delegates
//! the bytes layer to an injected `Serializer`.

use crate::command::Command;
use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current protocol version. Bumping this is a breaking wire change.
pub const PROTOCOL_VERSION: &str = "4";

/// Error envelope carried by a failing `RESPONSE`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub name: String,
    pub message: String,
    pub code: Option<i64>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub node_id: Option<NodeId>,
    pub data: Option<Value>,
    pub stack: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventPayload {
    pub event: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestPayload {
    pub id: String,
    pub action: String,
    pub params: Value,
    #[serde(default)]
    pub meta: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponsePayload {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfoPayload {
    pub services: Value,
    pub ip_list: Vec<String>,
    pub client: Value,
    pub config: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeartbeatPayload {
    pub cpu: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingPayload {
    pub time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PongPayload {
    pub time: i64,
    pub arrived: i64,
}

/// Command-tagged payload. The shape a command must carry is fixed by its
/// variant, not discovered at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd")]
pub enum Payload {
    #[serde(rename = "EVENT")]
    Event(EventPayload),
    #[serde(rename = "REQUEST")]
    Request(RequestPayload),
    #[serde(rename = "RESPONSE")]
    Response(ResponsePayload),
    #[serde(rename = "DISCOVER")]
    Discover,
    #[serde(rename = "INFO")]
    Info(InfoPayload),
    #[serde(rename = "DISCONNECT")]
    Disconnect,
    #[serde(rename = "HEARTBEAT")]
    Heartbeat(HeartbeatPayload),
    #[serde(rename = "PING")]
    Ping(PingPayload),
    #[serde(rename = "PONG")]
    Pong(PongPayload),
}

impl Payload {
    pub fn command(&self) -> Command {
        match self {
            Payload::Event(_) => Command::Event,
            Payload::Request(_) => Command::Request,
            Payload::Response(_) => Command::Response,
            Payload::Discover => Command::Discover,
            Payload::Info(_) => Command::Info,
            Payload::Disconnect => Command::Disconnect,
            Payload::Heartbeat(_) => Command::Heartbeat,
            Payload::Ping(_) => Command::Ping,
            Payload::Pong(_) => Command::Pong,
        }
    }
}

/// Full on-wire packet: header common to every command, plus its payload.
///
/// `target` names the peer a unicast command is addressed to (e.g. a
/// targeted `RESPONSE`, `PING`, or `EVENT`); `None` means broadcast. The
/// transporter is the one that turns `(command, target)` into a concrete
/// topic such as `RESPONSE@B`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Packet {
    pub ver: String,
    pub sender: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Packet {
    /// Builds a broadcast packet. Use [`Packet::targeted`] for unicast.
    pub fn new(sender: NodeId, payload: Payload) -> Self {
        Self {
            ver: PROTOCOL_VERSION.to_string(),
            sender,
            target: None,
            payload,
        }
    }

    /// Builds a packet addressed to a specific peer.
    pub fn targeted(sender: NodeId, target: NodeId, payload: Payload) -> Self {
        Self {
            ver: PROTOCOL_VERSION.to_string(),
            sender,
            target: Some(target),
            payload,
        }
    }

    pub fn command(&self) -> Command {
        self.payload.command()
    }
}
