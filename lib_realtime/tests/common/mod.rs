//! Shared in-memory fakes for driving the connection manager without a
//! network: a channel-backed transport and a scripted poll source.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc;

use lib_realtime::{
    Connector, PollError, PollItem, PollSource, RealtimeConfig, TransportError, WireSink,
    WireStream,
};

/// One accepted connection: what the manager wrote, and a way to feed it
/// inbound frames. Dropping `inject` looks like a remote close.
pub struct MockSession {
    pub sent: mpsc::UnboundedReceiver<String>,
    pub inject: mpsc::UnboundedSender<Result<String, TransportError>>,
}

/// Connector that refuses the first `fail_first` attempts, then hands out
/// channel-backed sessions and reports them to the test.
pub struct MockConnector {
    attempts: AtomicU32,
    fail_first: u32,
    sessions: mpsc::UnboundedSender<MockSession>,
}

impl MockConnector {
    pub fn new(fail_first: u32) -> (Arc<Self>, mpsc::UnboundedReceiver<MockSession>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                attempts: AtomicU32::new(0),
                fail_first,
                sessions: tx,
            }),
            rx,
        )
    }

    /// Total open attempts observed, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        _url: &str,
    ) -> BoxFuture<'static, Result<(WireSink, WireStream), TransportError>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let refuse = attempt <= self.fail_first;
        let sessions = self.sessions.clone();
        Box::pin(async move {
            if refuse {
                return Err(TransportError::Connect(format!("refused attempt {attempt}")));
            }
            let (sent_tx, sent_rx) = mpsc::unbounded_channel::<String>();
            let (inject_tx, inject_rx) =
                mpsc::unbounded_channel::<Result<String, TransportError>>();
            let _ = sessions.send(MockSession {
                sent: sent_rx,
                inject: inject_tx,
            });

            let sink = futures_util::sink::unfold(sent_tx, |tx, frame: String| async move {
                tx.send(frame).map_err(|_| TransportError::Closed)?;
                Ok(tx)
            });
            let stream = futures_util::stream::unfold(inject_rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });
            Ok((Box::pin(sink) as WireSink, Box::pin(stream) as WireStream))
        })
    }
}

/// Poll source returning whatever the test scripted, counting cycles.
pub struct MockPollSource {
    items: Mutex<Vec<PollItem>>,
    polls: AtomicU32,
}

impl MockPollSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            items: Mutex::new(Vec::new()),
            polls: AtomicU32::new(0),
        })
    }

    pub fn set_items(&self, items: Vec<PollItem>) {
        *self.items.lock().unwrap() = items;
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn item(id: &str, data: Value) -> PollItem {
        PollItem {
            id: id.to_string(),
            data,
        }
    }
}

impl PollSource for MockPollSource {
    fn fetch_latest<'a>(
        &'a self,
        _category: &'a str,
    ) -> BoxFuture<'a, Result<Vec<PollItem>, PollError>> {
        Box::pin(async move {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.lock().unwrap().clone())
        })
    }
}

/// Config with short, deterministic timings for paused-clock tests.
pub fn test_config() -> RealtimeConfig {
    RealtimeConfig {
        channel_url: "ws://channel.test/ws".to_string(),
        rest_base_url: "http://channel.test/v1/updates".to_string(),
        heartbeat_interval: Duration::from_secs(30),
        heartbeat_timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(5),
        reconnect_base_delay: Duration::from_millis(1000),
        reconnect_max_delay: Duration::from_millis(60000),
        max_reconnect_attempts: 5,
        poll_interval: Duration::from_secs(30),
        queue_capacity: 256,
    }
}

/// Bounds an await so a broken state machine fails the test instead of
/// hanging it. Under the paused clock this costs no wall time.
pub async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(3600), fut)
        .await
        .expect("test await timed out")
}

/// Parses a wire frame back into JSON for assertions.
pub fn as_json(frame: &str) -> Value {
    serde_json::from_str(frame).expect("manager wrote invalid JSON")
}
