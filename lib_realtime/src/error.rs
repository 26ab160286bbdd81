//! Error taxonomy for the live-update core.
//!
//! Transport failures are never surfaced to callers; they route the
//! connection manager into its reconnect cycle. Protocol failures drop the
//! offending frame and leave the channel open. Polling failures are retried
//! on the next cycle.

use thiserror::Error;

/// Socket-level failure of the push channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The channel could not be opened.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The remote side closed the channel.
    #[error("connection closed by remote")]
    Closed,

    /// The established channel failed mid-session.
    #[error("socket error: {0}")]
    Socket(String),
}

/// A single malformed or unusable wire frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON for the envelope shape.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// The envelope carried an empty `type` discriminant.
    #[error("envelope is missing a type discriminant")]
    MissingType,
}

/// Failure of one polling cycle against the fallback read endpoint.
#[derive(Debug, Error)]
pub enum PollError {
    /// The HTTP request failed or returned a non-success status.
    #[error("poll request failed: {0}")]
    Http(String),

    /// The response body could not be decoded.
    #[error("poll response decode failed: {0}")]
    Decode(String),
}
