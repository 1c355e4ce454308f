//! Task model and lifecycle state machine.
//!
//! A [`Task`] can only change through its transition methods, which enforce
//! the allowed status moves and keep `result`/`error` consistent with the
//! status: `result` is present iff the task is `completed`, `error` iff it is
//! `failed`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{TaskId, Timestamp};

/// Progress reported once the task has been admitted.
pub const PROGRESS_PROCESSING: u8 = 10;

/// Progress reported while the external job is running.
pub const PROGRESS_GENERATING: u8 = 50;

/// Progress reported once results are available.
pub const PROGRESS_DONE: u8 = 100;

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a task.
///
/// ```text
/// pending -> processing -> generating -> completed
///                |              |-----> failed
///                |              '-----> cancelled
///                |-----> failed
///                '-----> cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Generating,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Generating => "generating",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses never change again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Active tasks hold an in-flight admission slot.
    pub fn is_active(self) -> bool {
        matches!(self, TaskStatus::Processing | TaskStatus::Generating)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Generating)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Generating, Completed)
                | (Generating, Failed)
                | (Generating, Cancelled)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectRatio {
    #[default]
    Landscape,
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Landscape => "landscape",
            AspectRatio::Portrait => "portrait",
        }
    }
}

/// Generation options supplied with a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOptions {
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    /// Watermark removal is on unless the client explicitly opts out.
    #[serde(default = "default_remove_watermark")]
    pub remove_watermark: bool,
}

fn default_remove_watermark() -> bool {
    true
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            remove_watermark: default_remove_watermark(),
        }
    }
}

/// Artifacts and cost metadata of a completed generation.
///
/// Cost fields are passed through exactly as the generation API reports them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub urls: Vec<String>,
    pub consume_credits: Option<serde_json::Number>,
    pub cost_time: Option<serde_json::Number>,
    pub remained_credits: Option<serde_json::Number>,
}

/// Terminal outcome applied to an active task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded(TaskResult),
    Failed(String),
    Cancelled,
}

impl Outcome {
    /// The status a task lands in when this outcome is applied.
    pub fn status(&self) -> TaskStatus {
        match self {
            Outcome::Succeeded(_) => TaskStatus::Completed,
            Outcome::Failed(_) => TaskStatus::Failed,
            Outcome::Cancelled => TaskStatus::Cancelled,
        }
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move task from {from} to {to}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A single video generation request and everything known about it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    prompt: String,
    options: TaskOptions,
    status: TaskStatus,
    external_job_id: Option<String>,
    progress: u8,
    result: Option<TaskResult>,
    error: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
    /// When the external job was accepted (entered `generating`).
    submitted_at: Option<Timestamp>,
}

impl Task {
    /// Create a fresh `pending` task.
    pub fn new(id: TaskId, prompt: impl Into<String>, options: TaskOptions, now: Timestamp) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            options,
            status: TaskStatus::Pending,
            external_job_id: None,
            progress: 0,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            submitted_at: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &TaskOptions {
        &self.options
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn external_job_id(&self) -> Option<&str> {
        self.external_job_id.as_deref()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result(&self) -> Option<&TaskResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn submitted_at(&self) -> Option<Timestamp> {
        self.submitted_at
    }

    /// How long the task has been waiting on the external job, if it is
    /// currently `generating`.
    pub fn generating_for(&self, now: Timestamp) -> Option<chrono::Duration> {
        match (self.status, self.submitted_at) {
            (TaskStatus::Generating, Some(since)) => Some(now - since),
            _ => None,
        }
    }

    /// `pending -> processing`: the task took an admission slot.
    pub fn begin_processing(&mut self, now: Timestamp) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Processing, now)?;
        self.progress = PROGRESS_PROCESSING;
        Ok(())
    }

    /// `processing -> generating`: the generation API accepted the job.
    pub fn begin_generating(
        &mut self,
        external_job_id: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.advance(TaskStatus::Generating, now)?;
        self.external_job_id = Some(external_job_id.into());
        self.submitted_at = Some(now);
        self.progress = PROGRESS_GENERATING;
        Ok(())
    }

    /// Apply a terminal outcome.
    pub fn finish(&mut self, outcome: Outcome, now: Timestamp) -> Result<(), TransitionError> {
        self.advance(outcome.status(), now)?;
        match outcome {
            Outcome::Succeeded(result) => {
                self.result = Some(result);
                self.progress = PROGRESS_DONE;
            }
            Outcome::Failed(message) => {
                self.error = Some(message);
                self.progress = 0;
            }
            Outcome::Cancelled => {}
        }
        Ok(())
    }

    fn advance(&mut self, to: TaskStatus, now: Timestamp) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
