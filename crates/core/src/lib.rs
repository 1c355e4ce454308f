//! Domain types shared by every vidgen crate.
//!
//! Holds the task model and its state machine, the job report format used by
//! both webhook callbacks and status queries, and the [`JobSubmitter`]
//! contract the engine drives, plus the env helpers the config loaders share.

pub mod config;
pub mod error;
pub mod report;
pub mod submitter;
pub mod task;
pub mod task_events;
pub mod types;

pub use config::ConfigError;
pub use error::CoreError;
pub use report::JobReport;
pub use submitter::{JobSubmitter, SubmissionError};
pub use task::{AspectRatio, Outcome, Task, TaskOptions, TaskResult, TaskStatus, TransitionError};
pub use types::{TaskId, Timestamp};
