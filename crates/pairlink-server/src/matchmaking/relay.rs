//! Signal relay: forwards negotiation payloads between sessions.
//!
//! Payloads are never inspected. By default the declared target is trusted
//! as given, so any session can address any other session it knows the id
//! of. With `verify_partner` set, only the sender's current partner is a
//! valid target.

use super::queue::{MatchQueue, Notice};
use pairlink_core::{short_id, ServerMessage};
use serde_json::Value;
use tracing::{debug, warn};

/// Routes `signal` messages to their target session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalRelay {
    verify_partner: bool,
}

impl SignalRelay {
    pub fn new(verify_partner: bool) -> Self {
        Self { verify_partner }
    }

    /// Build the relayed notification, or `None` if the signal is dropped.
    pub fn route(&self, queue: &MatchQueue, from: &str, target: &str, signal: Value) -> Option<Notice> {
        if from == target {
            debug!(session_id = %short_id(from), "dropping signal addressed to sender");
            return None;
        }

        if self.verify_partner && queue.partner_of(from) != Some(target) {
            warn!(
                from = %short_id(from),
                target = %short_id(target),
                "dropping signal to non-partner"
            );
            return None;
        }

        debug!(from = %short_id(from), target = %short_id(target), "relaying signal");
        Some(Notice {
            to: target.to_string(),
            message: ServerMessage::Signal {
                peer_id: from.to_string(),
                signal,
            },
        })
    }
}
