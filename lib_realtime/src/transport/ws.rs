//! WebSocket-backed [`Connector`] built on `tokio-tungstenite`.

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use super::{Connector, WireSink, WireStream};
use crate::error::TransportError;

/// Production connector speaking the WebSocket protocol over `ws://` or
/// `wss://` endpoints.
#[derive(Debug, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Creates the connector.
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn connect(
        &self,
        url: &str,
    ) -> BoxFuture<'static, Result<(WireSink, WireStream), TransportError>> {
        let url = url.to_string();
        Box::pin(async move {
            let parsed =
                Url::parse(&url).map_err(|e| TransportError::Connect(e.to_string()))?;
            match parsed.scheme() {
                "ws" | "wss" => {}
                other => {
                    return Err(TransportError::Connect(format!(
                        "unsupported channel scheme '{}'",
                        other
                    )));
                }
            }

            let (ws_stream, _) = connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::Connect(e.to_string()))?;
            log::debug!("Channel established to {}", url);
            let (write, read) = ws_stream.split();

            let sink = write
                .with(|frame: String| {
                    futures_util::future::ready(Ok::<Message, tokio_tungstenite::tungstenite::Error>(
                        Message::Text(frame.into()),
                    ))
                })
                .sink_map_err(|e| TransportError::Socket(e.to_string()));

            // Control frames are handled by the protocol stack; only text
            // frames carry envelopes.
            let stream = read.filter_map(|item| {
                futures_util::future::ready(match item {
                    Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                    Ok(Message::Close(_)) => Some(Err(TransportError::Closed)),
                    Ok(_) => None,
                    Err(e) => Some(Err(TransportError::Socket(e.to_string()))),
                })
            });

            Ok((
                Box::pin(sink) as WireSink,
                Box::pin(stream) as WireStream,
            ))
        })
    }
}
