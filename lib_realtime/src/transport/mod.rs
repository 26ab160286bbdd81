//! Transport seam between the connection manager and the wire.
//!
//! The manager drives a boxed sink/stream pair of text frames and never
//! touches socket types directly; production code plugs in the WebSocket
//! connector, tests plug in channel-backed fakes.

pub mod ws;

use futures_util::future::BoxFuture;
use futures_util::{Sink, Stream};
use std::pin::Pin;

use crate::error::TransportError;

pub use ws::WsConnector;

/// Outbound half of an open channel: one JSON envelope per item.
pub type WireSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of an open channel. `None` means the remote closed it.
pub type WireStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Opens push channels. Exactly one connector is owned by the connection
/// manager; each successful call yields a fresh channel.
pub trait Connector: Send + Sync {
    /// Attempts to open the channel at `url`.
    fn connect(&self, url: &str)
        -> BoxFuture<'static, Result<(WireSink, WireStream), TransportError>>;
}
