//! Bookkeeping for `next` with acknowledgement.
//!
//! A `next` first waits for the server's `ack`. If the ack does not arrive in
//! time the client falls back to `leave`, then `join` after a short delay.
//! At most one sequence is in flight; it belongs to the epoch that issued it
//! and is void once that epoch is stale.

use crate::epoch::{Epoch, SessionEpoch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// `next{ack}` sent, waiting for `ack{id}`.
    AwaitingAck { ack_id: u64, tag: Epoch },
    /// Fallback `leave` sent, `join` scheduled.
    Rejoining { tag: Epoch },
}

#[derive(Debug, Default)]
pub(crate) struct NextAck {
    last_id: u64,
    pending: Option<Phase>,
}

impl NextAck {
    /// Start a sequence for `tag` and return the ack id to send.
    pub(crate) fn begin(&mut self, tag: Epoch) -> u64 {
        self.last_id += 1;
        self.pending = Some(Phase::AwaitingAck {
            ack_id: self.last_id,
            tag,
        });
        self.last_id
    }

    /// Whether a sequence issued under the current epoch is in flight.
    pub(crate) fn is_pending(&self, epoch: &SessionEpoch) -> bool {
        match self.pending {
            Some(Phase::AwaitingAck { tag, .. }) | Some(Phase::Rejoining { tag }) => {
                !epoch.is_stale(tag)
            }
            None => false,
        }
    }

    /// Consume an `ack{id}`. False for late or unknown ids.
    pub(crate) fn acknowledge(&mut self, id: u64) -> bool {
        match self.pending {
            Some(Phase::AwaitingAck { ack_id, .. }) if ack_id == id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// The ack timer fired. True when the fallback `leave` should be sent.
    pub(crate) fn timed_out(&mut self, tag: Epoch, id: u64) -> bool {
        match self.pending {
            Some(Phase::AwaitingAck { ack_id, tag: t }) if ack_id == id && t == tag => {
                self.pending = Some(Phase::Rejoining { tag });
                true
            }
            _ => false,
        }
    }

    /// The rejoin timer fired. True when the fallback `join` should be sent.
    pub(crate) fn rejoin_due(&mut self, tag: Epoch) -> bool {
        match self.pending {
            Some(Phase::Rejoining { tag: t }) if t == tag => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.pending = None;
    }
}
