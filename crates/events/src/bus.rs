//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`PlatformEvent`]s, shared
//! via `Arc<EventBus>` across the application. The notification path for
//! "training completed" toasts and generation results hangs off of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A domain event that occurred on the platform.
///
/// Constructed via [`PlatformEvent::new`] and enriched with
/// [`with_source`](PlatformEvent::with_source) and
/// [`with_payload`](PlatformEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"asset.training_completed"`.
    pub event_type: String,

    /// Optional source entity kind (e.g. `"asset"`, `"job"`).
    pub source_entity_type: Option<String>,

    /// Optional source entity id (provider-issued, opaque).
    pub source_entity_id: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach a source entity to the event.
    pub fn with_source(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id.into());
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`PlatformEvent`].
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: PlatformEvent) {
        // Ignore the SendError -- it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Open a new independent subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
