//! # Heartbeat Monitor
//!
//! Liveness bookkeeping for the open channel. A probe arms a deadline;
//! any inbound frame (not just the matching pong) disarms it, so a busy
//! channel is never torn down during low probe traffic. When the deadline
//! lapses the connection manager treats the silence as a failed transport
//! and reconnects, catching half-open connections that never emit a
//! transport-level close.

use std::time::Duration;
use tokio::time::Instant;

/// Tracks whether an outstanding probe has been acknowledged in time.
#[derive(Debug)]
pub struct Liveness {
    timeout: Duration,
    awaiting_since: Option<Instant>,
    last_activity: Instant,
}

impl Liveness {
    /// Starts tracking with no outstanding probe.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            awaiting_since: None,
            last_activity: now,
        }
    }

    /// Arms the acknowledgement deadline for a probe sent at `now`.
    /// A second probe while one is outstanding keeps the earlier deadline.
    pub fn probe_sent(&mut self, now: Instant) {
        if self.awaiting_since.is_none() {
            self.awaiting_since = Some(now);
        }
    }

    /// Records inbound traffic, disarming any outstanding deadline.
    pub fn note_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.awaiting_since = None;
    }

    /// Whether the outstanding probe has gone unacknowledged past the
    /// timeout window.
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.awaiting_since, Some(sent) if now.duration_since(sent) >= self.timeout)
    }

    /// Instant of the most recent inbound frame.
    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }
}
