//! Matchmaking: waiting slot, pair registry and signal relay.
//!
//! The waiting slot and the pair registry live together behind a single
//! lock owned by [`Matchmaker`]. Notifications produced by an operation are
//! delivered before the lock is released, so every session observes
//! notifications in decision order.

pub mod pairs;
pub mod queue;
pub mod relay;

pub use queue::{MatchQueue, Notice};
pub use relay::SignalRelay;

use crate::registry::ConnectionRegistry;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Applies matchmaking operations atomically and delivers their notifications.
pub struct Matchmaker {
    queue: Mutex<MatchQueue>,
    relay: SignalRelay,
    registry: Arc<ConnectionRegistry>,
}

impl Matchmaker {
    pub fn new(registry: Arc<ConnectionRegistry>, relay: SignalRelay) -> Self {
        Self {
            queue: Mutex::new(MatchQueue::new()),
            relay,
            registry,
        }
    }

    pub async fn join(&self, id: &str) {
        let mut queue = self.queue.lock().await;
        let notices = queue.join(id);
        self.deliver(notices).await;
    }

    pub async fn leave(&self, id: &str) {
        let mut queue = self.queue.lock().await;
        let notices = queue.leave(id);
        self.deliver(notices).await;
    }

    pub async fn next(&self, id: &str, ack: Option<u64>) {
        let mut queue = self.queue.lock().await;
        let notices = queue.next(id, ack);
        self.deliver(notices).await;
    }

    /// Leave matchmaking and drop the session from the connection registry.
    pub async fn disconnect(&self, id: &str) {
        let mut queue = self.queue.lock().await;
        let notices = queue.disconnect(id);
        self.deliver(notices).await;
        self.registry.unregister(id).await;
    }

    pub async fn relay(&self, from: &str, target: &str, signal: Value) {
        let queue = self.queue.lock().await;
        if let Some(notice) = self.relay.route(&queue, from, target, signal) {
            self.deliver(vec![notice]).await;
        }
    }

    /// Waiting session and live pair count, for diagnostics.
    pub async fn snapshot(&self) -> (Option<String>, usize) {
        let queue = self.queue.lock().await;
        (queue.waiting().map(str::to_string), queue.pair_count())
    }

    async fn deliver(&self, notices: Vec<Notice>) {
        for notice in notices {
            self.registry.send(&notice.to, notice.message).await;
        }
    }
}
