//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`TaskEvent`]s.
//! It is designed to be shared via `Arc<EventBus>` across the application.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use vidgen_core::task_events::{
    MSG_TYPE_TASK_COMPLETED, MSG_TYPE_TASK_CREATED, MSG_TYPE_TASK_UPDATE,
};
use vidgen_core::{Task, TaskStatus, Timestamp};

// ---------------------------------------------------------------------------
// TaskEvent
// ---------------------------------------------------------------------------

/// A task state change, carrying the full task snapshot after the change.
///
/// Serializes as `{"type": ..., "task": {...}, "timestamp": ...}`, which is
/// the frame format pushed to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
pub struct TaskEvent {
    /// One of the `MSG_TYPE_TASK_*` constants.
    #[serde(rename = "type")]
    pub event_type: &'static str,

    pub task: Task,

    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl TaskEvent {
    fn new(event_type: &'static str, task: Task) -> Self {
        Self {
            event_type,
            task,
            timestamp: Utc::now(),
        }
    }

    /// A task was just created.
    pub fn created(task: Task) -> Self {
        Self::new(MSG_TYPE_TASK_CREATED, task)
    }

    /// A task changed state. Completions and failures are tagged
    /// `task_completed`; every other move is a `task_update`.
    pub fn changed(task: Task) -> Self {
        let event_type = match task.status() {
            TaskStatus::Completed | TaskStatus::Failed => MSG_TYPE_TASK_COMPLETED,
            _ => MSG_TYPE_TASK_UPDATE,
        };
        Self::new(event_type, task)
    }

    /// Encode the event as a JSON text frame.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
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
/// independently receive every published [`TaskEvent`].
///
/// # Usage
///
/// ```rust
/// use vidgen_events::bus::EventBus;
///
/// let bus = EventBus::default();
/// let _rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
pub struct EventBus {
    sender: broadcast::Sender<TaskEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// observers re-derive state from task snapshots.
    pub fn publish(&self, event: TaskEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Task event published with no subscribers");
        }
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
