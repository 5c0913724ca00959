//! PING/PONG round trip and clock-skew estimate.

use crate::node::NodeId;
use serde::Serialize;

/// Result of a completed PING/PONG round trip, published locally as
/// `$node.pong`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongResult {
    pub node_id: NodeId,
    pub elapsed_time: i64,
    pub time_diff: i64,
}

/// `t0`: our send time. `arrived`: responder's receipt time. `t2`: our
/// receipt time of the PONG. Round-trip is `t2 - t0`; clock offset assumes
/// symmetric latency.
pub fn compute_pong(node_id: NodeId, t0: i64, arrived: i64, t2: i64) -> PongResult {
    let elapsed_time = t2 - t0;
    let time_diff = ((t2 - arrived) as f64 - (elapsed_time as f64) / 2.0).round() as i64;
    PongResult {
        node_id,
        elapsed_time,
        time_diff,
    }
}
