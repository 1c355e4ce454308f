//! WebSocket message type constants for task lifecycle events.
//!
//! Used by the event bus producers in `vidgen-engine` and the WebSocket
//! forwarder in `vidgen-api`.

/// A task was accepted and queued as `pending`.
pub const MSG_TYPE_TASK_CREATED: &str = "task_created";

/// A task moved to a non-terminal state (or was cancelled).
pub const MSG_TYPE_TASK_UPDATE: &str = "task_update";

/// A task reached `completed` or `failed`.
pub const MSG_TYPE_TASK_COMPLETED: &str = "task_completed";

/// Full snapshot sent to a WebSocket client right after it connects.
pub const MSG_TYPE_INITIAL_DATA: &str = "initial_data";
