//! # lib_realtime
//!
//! Live-update delivery core: a client that maintains a long-lived push
//! channel to a server, keeps it alive with heartbeats, buffers outbound
//! frames across disconnections, recovers with exponential backoff, and
//! degrades to REST polling once the retry budget is spent. Consumers
//! register interest in named event categories and receive decoded
//! payloads through callbacks, unaware of which mode produced them.

#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod fallback;
pub mod protocol;
pub mod transport;

pub use client::RealtimeClient;
pub use config::RealtimeConfig;
pub use crate::core::registry::{
    EventCallback, SubscriptionHandle, SubscriptionRegistry, UpdateEvent,
};
pub use crate::core::state::ConnectionState;
pub use error::{PollError, ProtocolError, TransportError};
pub use fallback::polling::{PollItem, PollSource, PollingDriver, RestPollSource};
pub use protocol::envelope::{Envelope, Frame};
pub use transport::{Connector, WireSink, WireStream, WsConnector};
