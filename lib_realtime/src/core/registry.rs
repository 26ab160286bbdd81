//! # Subscription Registry
//!
//! The registry is the fan-out point between the delivery core and its
//! consumers. It tracks two things: which event categories this process
//! wants the server to deliver, and which local callbacks are interested in
//! each category. It is stateless with respect to the network — the
//! connection manager reads the registered category set to re-issue
//! `subscribe` frames after every reconnect, so subscriptions behave as
//! declarative desired-state rather than one-shot commands.
//!
//! ## Dispatch contract
//!
//! 1. Callbacks for a category run synchronously, in registration order.
//! 2. A panicking callback is isolated: it is logged, the remaining
//!    callbacks still run, and the registry is left intact.
//! 3. The registry lock is not held while callbacks execute, so a callback
//!    may register or unregister subscriptions without deadlocking.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// A decoded live update handed to consumer callbacks.
///
/// Consumers cannot tell whether the event came off the push channel or was
/// synthesized by the polling failover; both paths dispatch through here.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    /// The event category the consumer registered for.
    pub category: String,
    /// Specific event name (e.g. `post_created`).
    pub event: String,
    /// Event payload.
    pub data: Value,
}

/// Callback invoked for every update in a subscribed category.
pub type EventCallback = Arc<dyn Fn(&UpdateEvent) + Send + Sync>;

/// Proof of registration; required to unregister.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u64,
    category: String,
}

impl SubscriptionHandle {
    /// The category this handle is registered under.
    pub fn category(&self) -> &str {
        &self.category
    }
}

/// Category → ordered callback list mapping.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: Mutex<HashMap<String, Vec<(u64, EventCallback)>>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for a category.
    ///
    /// Returns the handle plus whether this is the first local interest in
    /// the category (the caller then tells the server about it).
    pub fn register(
        &self,
        category: &str,
        callback: EventCallback,
    ) -> (SubscriptionHandle, bool) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscriptions.lock().expect("Registry lock poisoned");
        let entry = subs.entry(category.to_string()).or_default();
        let first_for_category = entry.is_empty();
        entry.push((id, callback));
        log::debug!("Registered callback {} for category '{}'", id, category);
        (
            SubscriptionHandle {
                id,
                category: category.to_string(),
            },
            first_for_category,
        )
    }

    /// Removes a callback. Returns whether the category lost its last
    /// local subscriber (the caller then withdraws the server-side
    /// subscription).
    pub fn unregister(&self, handle: &SubscriptionHandle) -> bool {
        let mut subs = self.subscriptions.lock().expect("Registry lock poisoned");
        let Some(entry) = subs.get_mut(&handle.category) else {
            return false;
        };
        entry.retain(|(id, _)| *id != handle.id);
        if entry.is_empty() {
            subs.remove(&handle.category);
            log::debug!("Category '{}' has no more subscribers", handle.category);
            true
        } else {
            false
        }
    }

    /// Every category with at least one registered callback.
    pub fn categories(&self) -> Vec<String> {
        let subs = self.subscriptions.lock().expect("Registry lock poisoned");
        subs.keys().cloned().collect()
    }

    /// Invokes the callbacks registered for the event's category.
    pub fn dispatch(&self, event: &UpdateEvent) {
        let callbacks: Vec<EventCallback> = {
            let subs = self.subscriptions.lock().expect("Registry lock poisoned");
            match subs.get(&event.category) {
                Some(entry) => entry.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => return,
            }
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                log::error!(
                    "Subscriber callback for category '{}' panicked on event '{}'",
                    event.category,
                    event.event
                );
            }
        }
    }
}
