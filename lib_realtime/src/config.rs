//! Runtime configuration for the live-update client.

use std::time::Duration;

/// Tunables for the push channel, its recovery policy, and the polling
/// failover. Applications usually build this from their own layered
/// configuration and hand it to [`crate::RealtimeClient`].
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Push channel endpoint (`ws://` or `wss://`).
    pub channel_url: String,
    /// Base URL of the REST read endpoint used while in polling failover.
    pub rest_base_url: String,
    /// Cadence of outbound liveness probes while the channel is open.
    pub heartbeat_interval: Duration,
    /// How long a probe may remain unacknowledged before the channel is
    /// treated as dead.
    pub heartbeat_timeout: Duration,
    /// Upper bound on a single channel-open attempt.
    pub connect_timeout: Duration,
    /// First reconnect delay; doubles on every consecutive failure.
    pub reconnect_base_delay: Duration,
    /// Ceiling applied to the exponential reconnect delay.
    pub reconnect_max_delay: Duration,
    /// Consecutive failed attempts tolerated before degrading to polling.
    pub max_reconnect_attempts: u32,
    /// Cadence of pull requests while in polling failover.
    pub poll_interval: Duration,
    /// Outbound frames buffered while disconnected; oldest are dropped past
    /// this capacity.
    pub queue_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_url: "wss://stream.livelink.app/ws".to_string(),
            rest_base_url: "https://api.livelink.app/v1/updates".to_string(),
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            reconnect_base_delay: Duration::from_millis(1000),
            reconnect_max_delay: Duration::from_millis(60000),
            max_reconnect_attempts: 5,
            poll_interval: Duration::from_secs(30),
            queue_capacity: 256,
        }
    }
}
