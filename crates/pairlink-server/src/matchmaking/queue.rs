//! Matchmaking queue: the waiting slot plus the pair registry.
//!
//! Operations are plain state transitions that return the notifications to
//! deliver. The caller serializes access (see [`super::Matchmaker`]), which
//! makes every join/leave/next/disconnect atomic with respect to both the
//! waiting slot and the pair registry.

use super::pairs::PairRegistry;
use pairlink_core::{short_id, ServerMessage};
use tracing::{debug, info, warn};

/// A notification addressed to one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub to: String,
    pub message: ServerMessage,
}

impl Notice {
    fn new(to: &str, message: ServerMessage) -> Self {
        Self {
            to: to.to_string(),
            message,
        }
    }
}

/// The waiting slot and the pairs built from it.
#[derive(Debug, Default)]
pub struct MatchQueue {
    waiting: Option<String>,
    pairs: PairRegistry,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter matchmaking.
    ///
    /// A session that is still paired leaves its pair first. With an empty
    /// slot the session starts waiting; otherwise it is paired with the
    /// waiting session and becomes the initiator.
    pub fn join(&mut self, id: &str) -> Vec<Notice> {
        let mut notices = self.dissolve(id);

        match self.waiting.take() {
            None => {
                debug!(session_id = %short_id(id), "session waiting");
                self.waiting = Some(id.to_string());
                notices.push(Notice::new(id, ServerMessage::Waiting));
            }
            Some(waiting) if waiting == id => {
                self.waiting = Some(waiting);
                notices.push(Notice::new(id, ServerMessage::Waiting));
            }
            Some(waiting) => {
                if let Err(e) = self.pairs.set(id, &waiting) {
                    warn!(error = %e, "pairing failed");
                    self.waiting = Some(waiting);
                    return notices;
                }
                info!(
                    initiator = %short_id(id),
                    responder = %short_id(&waiting),
                    "sessions paired"
                );
                notices.push(Notice::new(
                    id,
                    ServerMessage::Paired {
                        peer_id: waiting.clone(),
                        initiator: true,
                    },
                ));
                notices.push(Notice::new(
                    &waiting,
                    ServerMessage::Paired {
                        peer_id: id.to_string(),
                        initiator: false,
                    },
                ));
            }
        }

        notices
    }

    /// Exit the waiting slot and dissolve any pair, notifying the partner.
    pub fn leave(&mut self, id: &str) -> Vec<Notice> {
        if self.waiting.as_deref() == Some(id) {
            self.waiting = None;
            debug!(session_id = %short_id(id), "left waiting slot");
        }
        self.dissolve(id)
    }

    /// Leave and rejoin in one step, acknowledging before the rejoin result.
    pub fn next(&mut self, id: &str, ack: Option<u64>) -> Vec<Notice> {
        let mut notices = self.leave(id);
        if let Some(ack) = ack {
            notices.push(Notice::new(id, ServerMessage::Ack { id: ack }));
        }
        notices.extend(self.join(id));
        notices
    }

    /// A session's transport went away.
    pub fn disconnect(&mut self, id: &str) -> Vec<Notice> {
        self.leave(id)
    }

    /// The session currently in the waiting slot.
    pub fn waiting(&self) -> Option<&str> {
        self.waiting.as_deref()
    }

    /// Current partner of `id`.
    pub fn partner_of(&self, id: &str) -> Option<&str> {
        self.pairs.get(id)
    }

    /// Number of live pairs.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// The waiting session is never paired, and pairs are symmetric.
    pub fn is_consistent(&self) -> bool {
        let waiting_ok = self
            .waiting
            .as_deref()
            .map_or(true, |w| !self.pairs.is_paired(w));
        waiting_ok && self.pairs.is_symmetric()
    }

    fn dissolve(&mut self, id: &str) -> Vec<Notice> {
        match self.pairs.clear(id) {
            Some(partner) => {
                info!(session_id = %short_id(id), partner = %short_id(&partner), "pair dissolved");
                vec![Notice::new(
                    &partner,
                    ServerMessage::PartnerDisconnected {
                        from: id.to_string(),
                    },
                )]
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn paired(peer: &str, initiator: bool) -> ServerMessage {
        ServerMessage::Paired {
            peer_id: peer.into(),
            initiator,
        }
    }

    #[test]
    fn first_joiner_waits_second_initiates() {
        let mut q = MatchQueue::new();
        assert_eq!(q.join("a"), vec![Notice::new("a", ServerMessage::Waiting)]);
        assert_eq!(q.waiting(), Some("a"));

        let notices = q.join("b");
        assert_eq!(
            notices,
            vec![
                Notice::new("b", paired("a", true)),
                Notice::new("a", paired("b", false)),
            ]
        );
        assert_eq!(q.waiting(), None);
        assert_eq!(q.partner_of("a"), Some("b"));
        assert_eq!(q.partner_of("b"), Some("a"));
    }

    #[test]
    fn repeated_join_while_waiting_renotifies() {
        let mut q = MatchQueue::new();
        q.join("a");
        assert_eq!(q.join("a"), vec![Notice::new("a", ServerMessage::Waiting)]);
        assert_eq!(q.waiting(), Some("a"));
        assert_eq!(q.pair_count(), 0);
    }

    #[test]
    fn leave_notifies_partner() {
        let mut q = MatchQueue::new();
        q.join("a");
        q.join("b");
        let notices = q.leave("a");
        assert_eq!(
            notices,
            vec![Notice::new(
                "b",
                ServerMessage::PartnerDisconnected { from: "a".into() }
            )]
        );
        assert_eq!(q.partner_of("a"), None);
        assert_eq!(q.partner_of("b"), None);
        assert_eq!(q.waiting(), None);
    }

    #[test]
    fn leave_twice_is_noop() {
        let mut q = MatchQueue::new();
        assert!(q.leave("a").is_empty());
        assert!(q.leave("a").is_empty());
        assert_eq!(q.waiting(), None);
        assert_eq!(q.pair_count(), 0);
    }

    #[test]
    fn leave_clears_waiting_slot() {
        let mut q = MatchQueue::new();
        q.join("a");
        assert!(q.leave("a").is_empty());
        assert_eq!(q.waiting(), None);
        assert_eq!(q.join("b"), vec![Notice::new("b", ServerMessage::Waiting)]);
    }

    #[test]
    fn join_while_paired_leaves_first() {
        let mut q = MatchQueue::new();
        q.join("a");
        q.join("b");
        let notices = q.join("a");
        assert_eq!(
            notices,
            vec![
                Notice::new("b", ServerMessage::PartnerDisconnected { from: "a".into() }),
                Notice::new("a", ServerMessage::Waiting),
            ]
        );
        assert_eq!(q.waiting(), Some("a"));
        assert_eq!(q.partner_of("b"), None);
    }

    #[test]
    fn next_acks_before_rejoin_result() {
        let mut q = MatchQueue::new();
        q.join("a");
        q.join("b");
        q.join("c");
        let notices = q.next("a", Some(7));
        assert_eq!(
            notices,
            vec![
                Notice::new("b", ServerMessage::PartnerDisconnected { from: "a".into() }),
                Notice::new("a", ServerMessage::Ack { id: 7 }),
                Notice::new("a", paired("c", true)),
                Notice::new("c", paired("a", false)),
            ]
        );
        assert!(q.is_consistent());
    }

    #[test]
    fn next_without_ack_sends_no_ack() {
        let mut q = MatchQueue::new();
        q.join("a");
        let notices = q.next("a", None);
        assert_eq!(notices, vec![Notice::new("a", ServerMessage::Waiting)]);
    }

    #[test]
    fn disconnect_of_waiting_session_frees_slot() {
        let mut q = MatchQueue::new();
        q.join("a");
        assert!(q.disconnect("a").is_empty());
        assert_eq!(q.waiting(), None);
    }

    #[test]
    fn disconnect_of_paired_session_notifies_partner() {
        let mut q = MatchQueue::new();
        q.join("a");
        q.join("b");
        let notices = q.disconnect("b");
        assert_eq!(
            notices,
            vec![Notice::new("a", ServerMessage::PartnerDisconnected { from: "b".into() })]
        );
        assert_eq!(q.pair_count(), 0);
    }

    #[test]
    fn invariants_hold_under_random_operations() {
        let sessions: Vec<String> = (0..7).map(|i| format!("s{i}")).collect();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut q = MatchQueue::new();

        for _ in 0..5_000 {
            let id = &sessions[rng.gen_range(0..sessions.len())];
            match rng.gen_range(0..4) {
                0 => q.join(id),
                1 => q.leave(id),
                2 => q.next(id, Some(rng.gen())),
                _ => q.disconnect(id),
            };

            assert!(q.is_consistent());
            assert!(q.pair_count() <= sessions.len() / 2);
            if let Some(w) = q.waiting() {
                assert!(q.partner_of(w).is_none());
            }
        }
    }
}
