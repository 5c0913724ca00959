//! Pub/sub mesh transport layer.
//!
//! Owns the packet protocol and its versioning, the pending-request table
//! that correlates asynchronous responses with call sites, the connection
//! and subscription lifecycle, and the peer discovery / liveness loop
//! (DISCOVER, INFO, HEARTBEAT, PING/PONG).
//!
//! Transit is generic over a [`transporter::Transporter`] implementation
//! and talks to its owning service layer through the [`broker::Broker`]
//! and [`broker::Registry`] traits; neither a concrete transport nor a
//! concrete service registry ships in this crate.

pub mod broker;
pub mod clock;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod lifecycle;
pub mod liveness;
pub mod node;
pub mod outbound;
pub mod packet;
pub mod pending;
pub mod serializer;
pub mod state;
pub mod stats;
pub mod subscription;
pub mod transit;
pub mod transporter;

pub use broker::{Broker, CallerContext, ContextFactory, DefaultContextFactory, Registry};
pub use clock::{Clock, SystemClock, TestClock};
pub use command::Command;
pub use error::{RemoteFailure, TransitError};
pub use node::NodeId;
pub use outbound::CallRequest;
pub use packet::{Packet, Payload, PROTOCOL_VERSION};
pub use pending::RequestOutcome;
pub use serializer::{JsonSerializer, Serializer};
pub use state::TransitState;
pub use stats::TransitStats;
pub use transit::Transit;
pub use transporter::{OnConnect, OnMessage, Transporter};
