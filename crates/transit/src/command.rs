//! The closed set of wire commands.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Command tag carried by every packet header.
///
/// Closed set, mirroring the way `hooteproto::frame::Command` enumerates
/// its wire commands rather than leaving the tag an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    #[serde(rename = "EVENT")]
    Event,
    #[serde(rename = "REQUEST")]
    Request,
    #[serde(rename = "RESPONSE")]
    Response,
    #[serde(rename = "DISCOVER")]
    Discover,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "DISCONNECT")]
    Disconnect,
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
    #[serde(rename = "PING")]
    Ping,
    #[serde(rename = "PONG")]
    Pong,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Event => "EVENT",
            Command::Request => "REQUEST",
            Command::Response => "RESPONSE",
            Command::Discover => "DISCOVER",
            Command::Info => "INFO",
            Command::Disconnect => "DISCONNECT",
            Command::Heartbeat => "HEARTBEAT",
            Command::Ping => "PING",
            Command::Pong => "PONG",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
