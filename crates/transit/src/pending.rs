//! The pending-request table: correlates outbound REQUESTs with inbound
//! RESPONSEs by id.
//!
//! Generalizes the reactor task's `HashMap<Uuid, PendingRequest>` +
//! `oneshot` completion pattern from `hooteproto::client::HootClient` into
//! a standalone, lock-guarded table any caller can share.

use crate::error::{RemoteFailure, TransitError};
use crate::node::NodeId;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{oneshot, Mutex};

/// Outcome delivered to whoever called `request`.
pub type RequestOutcome = Result<Value, RemoteFailure>;

struct Entry {
    node_id: NodeId,
    action: String,
    completion: oneshot::Sender<RequestOutcome>,
}

/// Shared, mutex-guarded correlation table. A mutex is sufficient here: the
/// table's own critical sections are short (hash map operations), and the
/// spec allows either a mutex or a single-owner actor.
pub struct PendingTable {
    inner: Mutex<HashMap<String, Entry>>,
    max_queue_size: usize,
}

impl PendingTable {
    /// `max_queue_size == 0` means unbounded.
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_queue_size,
        }
    }

    /// Registers a new pending request, returning the receiver half of its
    /// completion channel. Rejects with `QueueFull` when the table is at
    /// capacity: reject when `size >= max_queue_size`, reporting the actual
    /// current size (the `.length`-vs-`.size` confusion in the source this
    /// was distilled from is resolved in favor of the real current size).
    pub async fn insert(
        &self,
        id: String,
        node_id: NodeId,
        action: String,
    ) -> Result<oneshot::Receiver<RequestOutcome>, TransitError> {
        let mut table = self.inner.lock().await;
        if self.max_queue_size > 0 && table.len() >= self.max_queue_size {
            return Err(TransitError::QueueFull {
                action,
                node: Some(node_id),
                size: table.len(),
                limit: self.max_queue_size,
            });
        }
        let (tx, rx) = oneshot::channel();
        table.insert(
            id,
            Entry {
                node_id,
                action,
                completion: tx,
            },
        );
        Ok(rx)
    }

    /// Completes and removes a pending entry on RESPONSE arrival. A miss
    /// (already swept, already completed, unknown id) is a silent no-op.
    pub async fn complete(&self, id: &str, outcome: RequestOutcome) {
        let mut table = self.inner.lock().await;
        if let Some(entry) = table.remove(id) {
            let _ = entry.completion.send(outcome);
        }
    }

    /// Sweeps every pending entry targeting `node_id`, completing each with
    /// `RequestRejected`. Called on peer disconnect.
    pub async fn cancel_by_node(&self, node_id: &NodeId) {
        let mut table = self.inner.lock().await;
        let ids: Vec<String> = table
            .iter()
            .filter(|(_, entry)| &entry.node_id == node_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in ids {
            if let Some(entry) = table.remove(&id) {
                let rejected = TransitError::RequestRejected {
                    action: entry.action,
                    node: entry.node_id,
                };
                let failure = match rejected {
                    TransitError::RequestRejected { action, node } => RemoteFailure {
                        name: "RequestRejectedError".to_string(),
                        message: format!(
                            "Request is rejected because peer '{}' is disconnected (NodeID: {})",
                            node, node
                        ),
                        code: Some(502),
                        error_type: None,
                        node_id: node,
                        data: Some(Value::String(action)),
                        stack: None,
                    },
                    _ => unreachable!(),
                };
                let _ = entry.completion.send(Err(failure));
            }
        }
    }

    pub async fn size(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_once_at_capacity_and_reports_real_size() {
        let table = PendingTable::new(2);
        let _a = table
            .insert("a".into(), NodeId::new("B"), "math.add".into())
            .await
            .unwrap();
        let _b = table
            .insert("b".into(), NodeId::new("B"), "math.add".into())
            .await
            .unwrap();
        let err = table
            .insert("c".into(), NodeId::new("B"), "math.add".into())
            .await
            .unwrap_err();
        match err {
            TransitError::QueueFull { size, limit, .. } => {
                assert_eq!(size, 2);
                assert_eq!(limit, 2);
            }
            other => panic!("expected QueueFull, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unbounded_when_zero() {
        let table = PendingTable::new(0);
        for i in 0..100 {
            table
                .insert(format!("id-{i}"), NodeId::new("B"), "x".into())
                .await
                .unwrap();
        }
        assert_eq!(table.size().await, 100);
    }

    #[tokio::test]
    async fn complete_on_unknown_id_is_a_noop() {
        let table = PendingTable::new(0);
        table.complete("missing", Ok(Value::Null)).await;
    }

    #[tokio::test]
    async fn swept_id_drops_late_response_silently() {
        let table = PendingTable::new(0);
        let mut rx = table
            .insert("r3".into(), NodeId::new("C"), "math.add".into())
            .await
            .unwrap();
        table.cancel_by_node(&NodeId::new("C")).await;
        let outcome = rx.try_recv().expect("sweep should have completed it");
        assert!(outcome.is_err());

        // A RESPONSE arriving afterward for the same id is a table miss.
        table.complete("r3", Ok(Value::Null)).await;
        assert_eq!(table.size().await, 0);
    }
}
