//! Reconnect policy: deterministic exponential backoff with a retry budget.
//!
//! No jitter is applied; the delay sequence is exactly
//! `base * 2^(attempt-1)`, clamped to the configured ceiling.

use std::time::Duration;

/// Tracks consecutive failed open attempts and derives the retry delay.
#[derive(Debug)]
pub struct ReconnectPolicy {
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ReconnectPolicy {
    /// Creates a fresh policy with no recorded failures.
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Consecutive failures recorded since the channel was last open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Records one failed open attempt.
    pub fn record_failure(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }

    /// Clears the failure count. Called exactly when the channel opens.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Whether the retry budget is spent.
    pub fn exhausted(&self) -> bool {
        self.attempt > self.max_attempts
    }

    /// The delay to wait before the next attempt, for the current count.
    pub fn current_delay(&self) -> Duration {
        self.delay_for(self.attempt)
    }

    /// `base * 2^(attempt-1)` for `attempt >= 1`, clamped to the ceiling.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(millis).min(self.max_delay)
    }
}
