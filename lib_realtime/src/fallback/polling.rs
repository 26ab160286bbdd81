//! # Polling Fallback Driver
//!
//! Degraded-mode ingestor activated once the reconnect budget is spent.
//! It pulls the latest items for every registered category at a fixed
//! cadence, diffs identifiers against the last-seen set, and synthesizes
//! update events through the same registry dispatch path the push channel
//! uses — consumers cannot tell which mode produced an event.
//!
//! ## Key behavior
//! - The first cycle for a category primes the last-seen baseline without
//!   synthesizing events, so entering fallback does not replay history.
//! - A failed cycle is logged and retried at the next tick; no backoff is
//!   applied to polling itself.
//! - The driver runs until its cancellation token fires; the connection
//!   manager cancels it when a fresh push connection is requested.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::core::registry::{SubscriptionRegistry, UpdateEvent};
use crate::error::PollError;

/// One item returned by the fallback read endpoint.
#[derive(Debug, Clone)]
pub struct PollItem {
    /// Stable identifier used for new-item detection.
    pub id: String,
    /// The item payload, forwarded as the event data.
    pub data: Value,
}

/// Pull source for the latest items of a category.
pub trait PollSource: Send + Sync {
    /// Fetches the current latest items for `category`.
    fn fetch_latest<'a>(
        &'a self,
        category: &'a str,
    ) -> BoxFuture<'a, Result<Vec<PollItem>, PollError>>;
}

/// REST-backed [`PollSource`] hitting `{base}/{category}/latest`.
pub struct RestPollSource {
    client: reqwest::Client,
    base_url: String,
}

impl RestPollSource {
    /// Creates a source with a pooled HTTP client. The request timeout
    /// keeps a dead endpoint from stalling the polling cadence.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("LiveLink/1.0")
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
        }
    }
}

impl PollSource for RestPollSource {
    fn fetch_latest<'a>(
        &'a self,
        category: &'a str,
    ) -> BoxFuture<'a, Result<Vec<PollItem>, PollError>> {
        Box::pin(async move {
            let url = format!("{}/{}/latest", self.base_url.trim_end_matches('/'), category);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| PollError::Http(e.to_string()))?;
            if !response.status().is_success() {
                return Err(PollError::Http(format!(
                    "{} returned status {}",
                    url,
                    response.status()
                )));
            }
            let values: Vec<Value> = response
                .json()
                .await
                .map_err(|e| PollError::Decode(e.to_string()))?;
            Ok(values.into_iter().filter_map(identified).collect())
        })
    }
}

/// Extracts the identifier; items without one cannot be diffed and are
/// skipped.
fn identified(value: Value) -> Option<PollItem> {
    let id = match value.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            log::debug!("Skipping polled item without an 'id' field");
            return None;
        }
    };
    Some(PollItem { id, data: value })
}

/// Periodic pull loop feeding the subscription registry.
pub struct PollingDriver {
    source: Arc<dyn PollSource>,
    registry: Arc<SubscriptionRegistry>,
    interval: Duration,
    last_seen: HashMap<String, HashSet<String>>,
}

impl PollingDriver {
    /// Creates a driver over the given source and registry.
    pub fn new(
        source: Arc<dyn PollSource>,
        registry: Arc<SubscriptionRegistry>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            interval,
            last_seen: HashMap::new(),
        }
    }

    /// Runs until cancelled. The first tick fires immediately so consumers
    /// get a baseline as soon as fallback mode begins.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::info!("Polling fallback driver stopped");
                    return;
                }
                _ = tick.tick() => {
                    self.poll_cycle().await;
                }
            }
        }
    }

    /// One pull pass over every currently registered category.
    pub async fn poll_cycle(&mut self) {
        for category in self.registry.categories() {
            match self.source.fetch_latest(&category).await {
                Ok(items) => self.reconcile(&category, items),
                Err(e) => {
                    // Non-fatal; the next tick simply retries.
                    log::warn!("Poll for category '{}' failed: {}", category, e);
                }
            }
        }
    }

    /// Diffs the fetched identifiers against the last-seen set and emits
    /// synthesized update events for the new ones.
    fn reconcile(&mut self, category: &str, items: Vec<PollItem>) {
        let current: HashSet<String> = items.iter().map(|item| item.id.clone()).collect();

        let Some(previous) = self
            .last_seen
            .insert(category.to_string(), current)
        else {
            log::debug!(
                "Primed polling baseline for category '{}' with {} items",
                category,
                items.len()
            );
            return;
        };

        for item in items {
            if previous.contains(&item.id) {
                continue;
            }
            self.registry.dispatch(&UpdateEvent {
                category: category.to_string(),
                event: "update".to_string(),
                data: item.data,
            });
        }
    }
}
