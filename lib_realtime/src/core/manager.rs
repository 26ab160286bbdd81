//! Connection manager: the only owner of the channel handle.
//!
//! A single spawned task drives the whole lifecycle — open, heartbeat,
//! reconnect with exponential backoff, and the hand-off to polling
//! fallback once the retry budget is spent. Everything else talks to it
//! through the command channel, so `send()` and `subscribe()` never block
//! and never fail on a disconnected channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::RealtimeConfig;
use crate::core::backoff::ReconnectPolicy;
use crate::core::heartbeat::Liveness;
use crate::core::queue::OutboundQueue;
use crate::core::registry::{SubscriptionRegistry, UpdateEvent};
use crate::core::state::{Command, ConnectionState};
use crate::error::TransportError;
use crate::fallback::polling::{PollSource, PollingDriver};
use crate::protocol::envelope::{Envelope, Frame};
use crate::transport::{Connector, WireSink, WireStream};

/// Cadence of the liveness watchdog while the channel is open.
const WATCHDOG_PERIOD: Duration = Duration::from_secs(1);

enum SessionEnd {
    /// `stop()` was requested; the channel was closed deliberately.
    Stopped,
    /// The transport failed or went silent.
    Lost,
    /// Every client handle is gone.
    Shutdown,
}

enum WaitEnd {
    Retry,
    Stopped,
    Shutdown,
}

enum PollEnd {
    Restart,
    Stopped,
    Shutdown,
}

enum CycleEnd {
    Stopped,
    Shutdown,
}

pub(crate) struct Manager {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    poll_source: Arc<dyn PollSource>,
    registry: Arc<SubscriptionRegistry>,
    state_tx: watch::Sender<ConnectionState>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    queue: OutboundQueue,
    policy: ReconnectPolicy,
}

impl Manager {
    pub(crate) fn new(
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        poll_source: Arc<dyn PollSource>,
        registry: Arc<SubscriptionRegistry>,
        state_tx: watch::Sender<ConnectionState>,
        cmd_rx: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let queue = OutboundQueue::new(config.queue_capacity);
        let policy = ReconnectPolicy::new(
            config.reconnect_base_delay,
            config.reconnect_max_delay,
            config.max_reconnect_attempts,
        );
        Self {
            config,
            connector,
            poll_source,
            registry,
            state_tx,
            cmd_rx,
            queue,
            policy,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            if !self.idle_wait().await {
                return;
            }
            match self.connect_cycle().await {
                CycleEnd::Stopped => {}
                CycleEnd::Shutdown => return,
            }
        }
    }

    /// Idle phase. Returns false when every client handle is gone.
    async fn idle_wait(&mut self) -> bool {
        self.set_state(ConnectionState::Idle);
        loop {
            match self.cmd_rx.recv().await {
                None => return false,
                Some(Command::Start) => return true,
                Some(Command::Stop) => {}
                Some(Command::Send(envelope)) => self.queue.push(envelope),
                Some(Command::CategoryAdded(_)) | Some(Command::CategoryRemoved(_)) => {}
            }
        }
    }

    /// Connect, recover, and degrade until stopped or shut down.
    async fn connect_cycle(&mut self) -> CycleEnd {
        loop {
            self.set_state(ConnectionState::Connecting);
            match self.open_attempt().await {
                Ok((sink, stream)) => match self.drive_session(sink, stream).await {
                    SessionEnd::Stopped => return CycleEnd::Stopped,
                    SessionEnd::Shutdown => return CycleEnd::Shutdown,
                    SessionEnd::Lost => self.policy.record_failure(),
                },
                Err(e) => {
                    log::error!("Channel open failed: {}", e);
                    self.policy.record_failure();
                }
            }

            self.set_state(ConnectionState::Reconnecting);
            if self.policy.exhausted() {
                log::warn!(
                    "Reconnect budget exhausted after {} consecutive failures; degrading to polling fallback",
                    self.policy.attempt()
                );
                match self.polling_mode().await {
                    PollEnd::Restart => continue,
                    PollEnd::Stopped => return CycleEnd::Stopped,
                    PollEnd::Shutdown => return CycleEnd::Shutdown,
                }
            }

            match self.reconnect_wait().await {
                WaitEnd::Retry => {}
                WaitEnd::Stopped => return CycleEnd::Stopped,
                WaitEnd::Shutdown => return CycleEnd::Shutdown,
            }
        }
    }

    async fn open_attempt(&mut self) -> Result<(WireSink, WireStream), TransportError> {
        log::info!("Connecting to channel: {}", self.config.channel_url);
        match timeout(
            self.config.connect_timeout,
            self.connector.connect(&self.config.channel_url),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Connect(format!(
                "timed out after {:?}",
                self.config.connect_timeout
            ))),
        }
    }

    /// Runs one open channel session until it ends.
    async fn drive_session(&mut self, mut sink: WireSink, mut stream: WireStream) -> SessionEnd {
        log::info!("Channel open");
        self.set_state(ConnectionState::Open);
        self.policy.reset();

        // Replay buffered frames in enqueue order before anything else. A
        // frame is only dequeued once the transport accepted it, so a
        // failure mid-replay leaves the remainder for the next session.
        let buffered = self.queue.len();
        while let Some(frame) = self.queue.front() {
            let wire = match frame.encode() {
                Ok(wire) => wire,
                Err(e) => {
                    log::error!("Dropping unencodable queued frame: {}", e);
                    self.queue.pop();
                    continue;
                }
            };
            if let Err(e) = sink.send(wire).await {
                log::error!("Channel failed while replaying queue: {}", e);
                return SessionEnd::Lost;
            }
            self.queue.pop();
        }
        if buffered > 0 {
            log::info!("Replayed {} buffered frames", buffered);
        }

        // Subscriptions are declarative desired-state; re-issue all of
        // them on every open.
        for category in self.registry.categories() {
            if self
                .send_frame(&mut sink, &Envelope::subscribe(&category))
                .await
                .is_err()
            {
                return SessionEnd::Lost;
            }
        }

        let mut liveness = Liveness::new(self.config.heartbeat_timeout, Instant::now());
        let period = self.config.heartbeat_interval;
        let mut probe = interval_at(Instant::now() + period, period);
        let mut watchdog = interval_at(Instant::now() + WATCHDOG_PERIOD, WATCHDOG_PERIOD);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    None => {
                        let _ = sink.close().await;
                        return SessionEnd::Shutdown;
                    }
                    Some(Command::Stop) => {
                        self.set_state(ConnectionState::Closing);
                        if let Err(e) = sink.close().await {
                            log::debug!("Error closing channel: {}", e);
                        }
                        return SessionEnd::Stopped;
                    }
                    Some(Command::Start) => {
                        log::debug!("start() ignored; channel already open");
                    }
                    Some(Command::Send(envelope)) => {
                        if self.send_frame(&mut sink, &envelope).await.is_err() {
                            return SessionEnd::Lost;
                        }
                    }
                    Some(Command::CategoryAdded(category)) => {
                        if self
                            .send_frame(&mut sink, &Envelope::subscribe(&category))
                            .await
                            .is_err()
                        {
                            return SessionEnd::Lost;
                        }
                    }
                    Some(Command::CategoryRemoved(category)) => {
                        if self
                            .send_frame(&mut sink, &Envelope::unsubscribe(&category))
                            .await
                            .is_err()
                        {
                            return SessionEnd::Lost;
                        }
                    }
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(text)) => {
                        liveness.note_activity(Instant::now());
                        if let Err(end) = self.handle_frame(&mut sink, &text).await {
                            return end;
                        }
                    }
                    Some(Err(e)) => {
                        log::error!("Channel read error: {}", e);
                        return SessionEnd::Lost;
                    }
                    None => {
                        log::warn!("Channel closed by remote");
                        return SessionEnd::Lost;
                    }
                },
                _ = probe.tick() => {
                    liveness.probe_sent(Instant::now());
                    if self.send_frame(&mut sink, &Envelope::ping()).await.is_err() {
                        return SessionEnd::Lost;
                    }
                }
                _ = watchdog.tick() => {
                    if liveness.is_expired(Instant::now()) {
                        log::warn!(
                            "Liveness probe unacknowledged for {:?}; treating channel as dead",
                            self.config.heartbeat_timeout
                        );
                        return SessionEnd::Lost;
                    }
                }
            }
        }
    }

    /// Decodes and dispatches one inbound frame. A malformed or unknown
    /// frame is dropped without touching the connection.
    async fn handle_frame(
        &self,
        sink: &mut WireSink,
        text: &str,
    ) -> Result<(), SessionEnd> {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("Dropping undecodable frame: {}", e);
                return Ok(());
            }
        };
        match Frame::classify(envelope) {
            Frame::Ping => {
                if self.send_frame(sink, &Envelope::pong()).await.is_err() {
                    return Err(SessionEnd::Lost);
                }
            }
            Frame::Pong => {}
            Frame::SubscriptionConfirmed { category } => {
                log::debug!(
                    "Subscription confirmed for '{}'",
                    category.as_deref().unwrap_or("?")
                );
            }
            Frame::Update {
                category,
                event,
                data,
            } => {
                self.registry.dispatch(&UpdateEvent {
                    category,
                    event,
                    data,
                });
            }
            Frame::ServerError { category, message } => match category {
                // The local registry entry is kept; the next reconnect
                // retries the subscription.
                Some(category) => log::warn!(
                    "Server rejected category '{}': {}",
                    category,
                    message
                ),
                None => log::warn!("Server error frame: {}", message),
            },
            Frame::Unknown { kind } => {
                log::warn!("Dropping frame with unknown type '{}'", kind);
            }
        }
        Ok(())
    }

    /// Backoff wait. The retry timer is cancellable by `stop()`, and
    /// frames sent meanwhile keep queuing.
    async fn reconnect_wait(&mut self) -> WaitEnd {
        let delay = self.policy.current_delay();
        log::info!(
            "Retrying channel in {:?} (failure {})",
            delay,
            self.policy.attempt()
        );
        let retry = tokio::time::sleep(delay);
        tokio::pin!(retry);
        loop {
            tokio::select! {
                _ = &mut retry => return WaitEnd::Retry,
                cmd = self.cmd_rx.recv() => match cmd {
                    None => return WaitEnd::Shutdown,
                    Some(Command::Stop) => {
                        log::info!("Retry cancelled by stop()");
                        return WaitEnd::Stopped;
                    }
                    Some(Command::Start) => {
                        log::debug!("start() ignored; retry already scheduled");
                    }
                    Some(Command::Send(envelope)) => self.queue.push(envelope),
                    Some(Command::CategoryAdded(_)) | Some(Command::CategoryRemoved(_)) => {}
                },
            }
        }
    }

    /// Degraded mode: the polling driver delivers updates until a caller
    /// asks for a fresh channel attempt or stops the client.
    async fn polling_mode(&mut self) -> PollEnd {
        self.set_state(ConnectionState::PollingFallback);
        let cancel = CancellationToken::new();
        let driver = PollingDriver::new(
            Arc::clone(&self.poll_source),
            Arc::clone(&self.registry),
            self.config.poll_interval,
        );
        let worker = tokio::spawn(driver.run(cancel.clone()));

        let outcome = loop {
            match self.cmd_rx.recv().await {
                None => break PollEnd::Shutdown,
                Some(Command::Start) => {
                    log::info!("Leaving polling fallback for a fresh channel attempt");
                    break PollEnd::Restart;
                }
                Some(Command::Stop) => break PollEnd::Stopped,
                Some(Command::Send(envelope)) => self.queue.push(envelope),
                // The driver reads the live registry each cycle.
                Some(Command::CategoryAdded(_)) | Some(Command::CategoryRemoved(_)) => {}
            }
        };

        cancel.cancel();
        if let Err(e) = worker.await {
            log::error!("Polling driver task failed: {}", e);
        }
        outcome
    }

    async fn send_frame(
        &self,
        sink: &mut WireSink,
        envelope: &Envelope,
    ) -> Result<(), TransportError> {
        let wire = match envelope.encode() {
            Ok(wire) => wire,
            Err(e) => {
                log::error!("Dropping unencodable '{}' frame: {}", envelope.kind, e);
                return Ok(());
            }
        };
        sink.send(wire).await.inspect_err(|e| {
            log::error!("Channel write failed: {}", e);
        })
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = *self.state_tx.borrow();
        if previous != state {
            log::info!("Connection state: {:?} -> {:?}", previous, state);
            self.state_tx.send_replace(state);
        }
    }
}
