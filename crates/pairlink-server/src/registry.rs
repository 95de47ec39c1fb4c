//! Connection registry.
//!
//! Tracks every connected session by its server-assigned identity together
//! with the outbound queue used to push notifications to it. A session is
//! live exactly while it has an entry here.

use pairlink_core::{short_id, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// A connected session.
#[derive(Debug)]
pub struct SessionEntry {
    /// Remote address of the transport.
    pub remote_addr: SocketAddr,
    /// When the session connected.
    pub connected_at: Instant,
    /// Outbound queue drained by the session's own task.
    tx: mpsc::Sender<ServerMessage>,
}

/// Registry of live sessions.
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    /// Capacity of each session's outbound queue.
    queue_size: usize,
    /// Maximum number of concurrently registered sessions.
    capacity: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry holding at most `capacity` sessions, each with
    /// a `queue_size`-deep outbound queue.
    pub fn new(queue_size: usize, capacity: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            queue_size: queue_size.max(1),
            capacity,
        }
    }

    /// Register a new session and return its identity and outbound receiver.
    ///
    /// Returns `None` when the registry is at capacity. The check and the
    /// insert happen under one write lock.
    pub async fn register(
        &self,
        remote_addr: SocketAddr,
    ) -> Option<(String, mpsc::Receiver<ServerMessage>)> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.capacity {
            return None;
        }
        let (tx, rx) = mpsc::channel(self.queue_size);

        let mut id = generate_session_id();
        while sessions.contains_key(&id) {
            id = generate_session_id();
        }

        sessions.insert(
            id.clone(),
            SessionEntry {
                remote_addr,
                connected_at: Instant::now(),
                tx,
            },
        );

        info!(session_id = %short_id(&id), remote = %remote_addr, "session registered");
        Some((id, rx))
    }

    /// Remove a session. Returns `false` if it was not registered.
    pub async fn unregister(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(entry) => {
                debug!(
                    session_id = %short_id(id),
                    remote = %entry.remote_addr,
                    connected_secs = entry.connected_at.elapsed().as_secs(),
                    "session unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Push a message to a session's outbound queue.
    ///
    /// Best-effort: returns `false` when the session is gone or its queue is
    /// full. Nothing is retained for later delivery.
    pub async fn send(&self, id: &str, message: ServerMessage) -> bool {
        let sessions = self.sessions.read().await;
        let Some(entry) = sessions.get(id) else {
            debug!(session_id = %short_id(id), kind = message.kind(), "target session not connected");
            return false;
        };

        match entry.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(session_id = %short_id(id), kind = message.kind(), "outbound queue full, dropping");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(session_id = %short_id(id), "outbound queue closed");
                false
            }
        }
    }

    /// Whether a session is currently connected.
    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Number of connected sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Generate a random session ID (hex-encoded, 16 bytes = 32 hex chars).
fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9".parse().unwrap()
    }

    #[tokio::test]
    async fn register_assigns_unique_ids() {
        let registry = ConnectionRegistry::new(8, 16);
        let (a, _rx_a) = registry.register(addr()).await.unwrap();
        let (b, _rx_b) = registry.register(addr()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert_eq!(registry.count().await, 2);
        assert!(registry.contains(&a).await);
    }

    #[tokio::test]
    async fn send_delivers_in_order() {
        let registry = ConnectionRegistry::new(8, 16);
        let (id, mut rx) = registry.register(addr()).await.unwrap();
        assert!(registry.send(&id, ServerMessage::Waiting).await);
        assert!(registry.send(&id, ServerMessage::Ack { id: 1 }).await);
        assert_eq!(rx.recv().await, Some(ServerMessage::Waiting));
        assert_eq!(rx.recv().await, Some(ServerMessage::Ack { id: 1 }));
    }

    #[tokio::test]
    async fn send_to_unknown_session_is_dropped() {
        let registry = ConnectionRegistry::new(8, 16);
        assert!(!registry.send("missing", ServerMessage::Waiting).await);
    }

    #[tokio::test]
    async fn full_queue_drops_message() {
        let registry = ConnectionRegistry::new(1, 16);
        let (id, mut rx) = registry.register(addr()).await.unwrap();
        assert!(registry.send(&id, ServerMessage::Waiting).await);
        assert!(!registry.send(&id, ServerMessage::Ack { id: 2 }).await);
        assert_eq!(rx.recv().await, Some(ServerMessage::Waiting));
    }

    #[tokio::test]
    async fn unregister_removes_session() {
        let registry = ConnectionRegistry::new(8, 16);
        let (id, _rx) = registry.register(addr()).await.unwrap();
        assert!(registry.unregister(&id).await);
        assert!(!registry.unregister(&id).await);
        assert!(!registry.contains(&id).await);
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn register_refuses_past_capacity() {
        let registry = ConnectionRegistry::new(8, 2);
        let (a, _rx_a) = registry.register(addr()).await.unwrap();
        let (_b, _rx_b) = registry.register(addr()).await.unwrap();
        assert!(registry.register(addr()).await.is_none());
        assert_eq!(registry.count().await, 2);

        registry.unregister(&a).await;
        assert!(registry.register(addr()).await.is_some());
    }

    #[tokio::test]
    async fn concurrent_registrations_respect_capacity() {
        let registry = std::sync::Arc::new(ConnectionRegistry::new(8, 3));
        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.register(addr()).await.map(|(id, _rx)| id) })
            })
            .collect();
        let mut admitted = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_some() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 3);
        assert_eq!(registry.count().await, 3);
    }
}
