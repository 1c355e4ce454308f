//! Contract for the external video generation API.
//!
//! The engine only talks to the generation service through [`JobSubmitter`],
//! so tests can script submissions without a network.

use async_trait::async_trait;

use crate::report::JobReport;
use crate::task::TaskOptions;

/// Errors surfaced by a [`JobSubmitter`].
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The API answered but refused the request.
    #[error("Generation API rejected the request ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// The API could not be reached (network, DNS, timeout, non-2xx status).
    #[error("Generation API unreachable: {0}")]
    Transport(String),

    /// The API answered with something we could not interpret.
    #[error("Malformed generation API response: {0}")]
    Malformed(String),
}

/// Submits generation jobs and looks up their state.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Queue a job and return the external job identifier.
    async fn submit(&self, prompt: &str, options: &TaskOptions) -> Result<String, SubmissionError>;

    /// Fetch the current record of a previously submitted job.
    async fn query(&self, external_job_id: &str) -> Result<JobReport, SubmissionError>;
}
