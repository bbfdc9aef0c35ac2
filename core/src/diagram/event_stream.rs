// Event streaming for the diagram
//
// Uses tokio broadcast channel to fan refresh and selection events out to
// any number of listeners (UI bridge, console logger, tests)

use crate::selection::SelectionKey;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event sent to diagram listeners
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagramEvent {
    /// Timestamp (ISO 8601)
    pub timestamp: String,
    /// Event type
    pub event_type: DiagramEventType,
    /// Selection the event belongs to, if any
    pub key: Option<SelectionKey>,
    /// Short human-readable detail
    pub message: String,
}

impl DiagramEvent {
    pub fn new(
        event_type: DiagramEventType,
        key: Option<SelectionKey>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            event_type,
            key,
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramEventType {
    /// Selection changed (including back to idle)
    SelectionChanged,
    /// Building snapshot replaced
    SnapshotUpdated,
    /// Faculty aggregate replaced
    AggregateUpdated,
    /// Selected faculty has no buildings
    AggregateEmpty,
    /// Scheduled poll failed; prior data kept
    PollFailed,
    /// Faculty aggregation failed; prior aggregate kept
    AggregateFailed,
    /// Response for an outdated selection was dropped
    StaleResponseDiscarded,
}

/// Event broadcaster for the diagram
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<DiagramEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with buffer size
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast(&self, event: DiagramEvent) {
        // Ignore error if no subscribers
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<DiagramEvent> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
