//! Exponential backoff for control-channel reconnection.

use rand::Rng;
use std::time::Duration;

/// Jitter applied as a fraction of the base delay, in both directions.
const JITTER: f64 = 0.2;

/// Computes reconnection delays: doubling from `initial`, capped at `max`,
/// with a little jitter so many clients do not reconnect in lockstep.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
            attempts: 0,
        }
    }

    /// Delay before the next attempt. Advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.attempts += 1;
        self.current = self.current.saturating_mul(2).min(self.max);

        let jittered = if base.is_zero() {
            base
        } else {
            let factor = rand::thread_rng().gen_range((1.0 - JITTER)..=(1.0 + JITTER));
            base.mul_f64(factor)
        };
        jittered.min(self.max)
    }

    /// Back to the initial delay after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
