//! Connection lifecycle states and the manager's command protocol.

use crate::protocol::envelope::Envelope;

/// Lifecycle of the push channel, mutated only by the connection manager
/// and published through a watch channel.
///
/// `Idle` and `PollingFallback` are the only states reachable without an
/// active transport handle; `Closing` is a transient exit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel and no retry scheduled.
    Idle,
    /// A channel-open attempt is in flight.
    Connecting,
    /// The channel is established and heartbeats are running.
    Open,
    /// The channel was lost; a retry timer is pending.
    Reconnecting,
    /// The channel is being closed deliberately.
    Closing,
    /// The retry budget is spent; updates arrive via periodic pulls.
    PollingFallback,
}

/// Requests sent from the client handle into the manager task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Open the channel, or leave polling fallback for a fresh attempt.
    Start,
    /// Close the channel and cancel every pending timer.
    Stop,
    /// Transmit a frame now, or queue it while disconnected.
    Send(Envelope),
    /// A category gained its first local subscriber.
    CategoryAdded(String),
    /// A category lost its last local subscriber.
    CategoryRemoved(String),
}
