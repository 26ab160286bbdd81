//! # Realtime Client Handle
//!
//! The application-facing surface of the live-update core. One instance is
//! constructed by the application's startup routine and passed by reference
//! to whatever needs to subscribe or send — there is no global singleton,
//! which keeps the component independently testable.
//!
//! All operations are non-blocking: they enqueue commands for the manager
//! task that exclusively owns the channel handle. `send()` in particular
//! never fails for a disconnected channel; buffering is the
//! error-avoidance strategy.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::config::RealtimeConfig;
use crate::core::manager::Manager;
use crate::core::registry::{SubscriptionHandle, SubscriptionRegistry, UpdateEvent};
use crate::core::state::{Command, ConnectionState};
use crate::fallback::polling::{PollSource, RestPollSource};
use crate::protocol::envelope::Envelope;
use crate::transport::{Connector, WsConnector};

/// Cloneable handle to one live-update core instance.
#[derive(Clone)]
pub struct RealtimeClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    registry: Arc<SubscriptionRegistry>,
}

impl RealtimeClient {
    /// Spawns the manager task with the production WebSocket transport and
    /// REST polling source. Must be called inside a tokio runtime.
    pub fn spawn(config: RealtimeConfig) -> Self {
        let connector: Arc<dyn Connector> = Arc::new(WsConnector::new());
        let poll_source: Arc<dyn PollSource> =
            Arc::new(RestPollSource::new(config.rest_base_url.clone()));
        Self::spawn_with(config, connector, poll_source)
    }

    /// Spawns the manager task over caller-supplied transport and polling
    /// implementations.
    pub fn spawn_with(
        config: RealtimeConfig,
        connector: Arc<dyn Connector>,
        poll_source: Arc<dyn PollSource>,
    ) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let manager = Manager::new(
            config,
            connector,
            poll_source,
            Arc::clone(&registry),
            state_tx,
            cmd_rx,
        );
        tokio::spawn(manager.run());
        Self {
            cmd_tx,
            state_rx,
            registry,
        }
    }

    /// Opens the push channel. A no-op while already connecting or open;
    /// from polling fallback it triggers a fresh connection attempt.
    pub fn start(&self) {
        let _ = self.cmd_tx.send(Command::Start);
    }

    /// Closes the channel and cancels every pending retry and heartbeat
    /// timer. Nothing reconnects until `start()` is called again.
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(Command::Stop);
    }

    /// Transmits a frame, or buffers it while the channel is not open.
    pub fn send(&self, envelope: Envelope) {
        let _ = self.cmd_tx.send(Command::Send(envelope));
    }

    /// Registers a callback for every update in `category`. The
    /// subscription survives reconnects until explicitly removed.
    pub fn subscribe(
        &self,
        category: &str,
        callback: impl Fn(&UpdateEvent) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let (handle, first_for_category) = self.registry.register(category, Arc::new(callback));
        if first_for_category {
            let _ = self
                .cmd_tx
                .send(Command::CategoryAdded(category.to_string()));
        }
        handle
    }

    /// Removes a previously registered callback.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.registry.unregister(&handle) {
            let _ = self
                .cmd_tx
                .send(Command::CategoryRemoved(handle.category().to_string()));
        }
    }

    /// Current lifecycle state. [`ConnectionState::PollingFallback`] is
    /// the degraded-service indicator.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch channel for lifecycle transitions.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}
