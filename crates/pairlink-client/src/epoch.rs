//! Session epoch: the fencing counter behind every stale-callback check.
//!
//! The counter is bumped on each user transition (start, next, stop) and on
//! each server-confirmed re-pair. Work issued under an older value is
//! discarded when it completes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An epoch value captured when asynchronous work is issued.
pub type Epoch = u64;

/// Shared, monotonically increasing epoch counter.
///
/// Cloning yields another handle to the same counter, so detached tasks can
/// check staleness without access to the state machine.
#[derive(Debug, Clone, Default)]
pub struct SessionEpoch {
    current: Arc<AtomicU64>,
}

impl SessionEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the epoch and return the new value.
    pub fn bump(&self) -> Epoch {
        self.current.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn current(&self) -> Epoch {
        self.current.load(Ordering::Acquire)
    }

    /// True when `tag` no longer matches the current epoch.
    pub fn is_stale(&self, tag: Epoch) -> bool {
        tag != self.current()
    }
}
