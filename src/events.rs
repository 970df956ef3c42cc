//! Typed in-process event bus.
//!
//! One broadcast channel carries every change notification. Producers are
//! the location service and the listing store; consumers are whatever part of
//! the app wants to re-read shared state when it changes.

use tokio::sync::broadcast;
use tracing::debug;

use crate::location::LocationReading;

/// Change notifications published on the bus
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A fresh location reading was stored in the cache
    LocationUpdated(LocationReading),
    /// The search radius changed
    RadiusChanged { radius_km: f64 },
    /// The listing set was replaced by a fetch
    ListingsRefreshed { count: usize },
    /// A listing was added, edited or removed locally
    ListingChanged { id: String, change: ListingChange },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingChange {
    Added,
    Updated,
    Removed,
}

/// Cloneable handle to the bus
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// Create a new bus with default capacity (64 events)
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. No-op if nobody is listening.
    pub fn publish(&self, event: AppEvent) {
        debug!(?event, "publish");
        // Ignore send errors (no active receivers)
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
