//! The fixed subscription set and the barrier that gates outbound publish
//! until every topic in it is live.

use crate::node::NodeId;
use tokio::sync::Notify;

/// A topic, scoped to this node (`@self`) or broadcast across the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Bare broadcast topic, e.g. `DISCOVER`.
    Broadcast(&'static str),
    /// Topic scoped to a single node, e.g. `INFO@self`.
    Scoped(&'static str, NodeId),
}

/// The full set declared once at `Subscribing`, built from this node's id.
pub fn core_topics(self_node: &NodeId) -> Vec<Topic> {
    vec![
        Topic::Scoped("EVENT", self_node.clone()),
        Topic::Scoped("REQUEST", self_node.clone()),
        Topic::Scoped("RESPONSE", self_node.clone()),
        Topic::Broadcast("DISCOVER"),
        Topic::Scoped("DISCOVER", self_node.clone()),
        Topic::Broadcast("INFO"),
        Topic::Scoped("INFO", self_node.clone()),
        Topic::Broadcast("DISCONNECT"),
        Topic::Broadcast("HEARTBEAT"),
        Topic::Broadcast("PING"),
        Topic::Scoped("PING", self_node.clone()),
        Topic::Scoped("PONG", self_node.clone()),
    ]
}

/// One-shot readiness gate: outbound publish attempted before all core
/// subscriptions succeed is deferred until the barrier opens; afterward
/// every wait resolves immediately.
#[derive(Debug, Default)]
pub struct SubscriptionBarrier {
    notify: Notify,
    opened: std::sync::atomic::AtomicBool,
}

impl SubscriptionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the barrier, releasing every waiter. Idempotent.
    pub fn open(&self) {
        if !self.opened.swap(true, std::sync::atomic::Ordering::AcqRel) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Resolves immediately once the barrier is open; otherwise waits.
    pub async fn wait(&self) {
        // Create the notified future before checking the flag: `Notify`
        // guarantees a `notify_waiters` call landing between creation and
        // polling is still observed.
        let notified = self.notify.notified();
        if self.is_open() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_topics_includes_every_fixed_entry() {
        let topics = core_topics(&NodeId::new("self"));
        assert_eq!(topics.len(), 12);
    }

    #[tokio::test]
    async fn wait_resolves_immediately_once_opened() {
        let barrier = SubscriptionBarrier::new();
        barrier.open();
        barrier.wait().await;
    }

    #[tokio::test]
    async fn waiters_release_when_opened() {
        let barrier = std::sync::Arc::new(SubscriptionBarrier::new());
        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
            })
        };
        tokio::task::yield_now().await;
        barrier.open();
        waiter.await.unwrap();
    }
}
