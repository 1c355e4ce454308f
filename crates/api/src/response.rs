//! Response envelope types for API handlers.
//!
//! Task endpoints answer `{ "task": ... }` or `{ "tasks": [...] }`; actions
//! without a payload answer `{ "message": ... }`.

use serde::Serialize;
use vidgen_core::Task;

/// `{ "task": Task }`
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task: Task,
}

/// `{ "tasks": [Task] }`
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

/// `{ "message": String }`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
