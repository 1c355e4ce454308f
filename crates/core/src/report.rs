//! Job reports from the generation API.
//!
//! The webhook callback body and the status query response carry the same
//! record shape, so both are decoded into [`JobReport`] and interpreted by
//! [`JobReport::outcome`].

use serde::Deserialize;
use serde_json::Number;

use crate::error::CoreError;
use crate::task::{Outcome, TaskResult};

/// External state reported for a finished, successful job.
pub const STATE_SUCCESS: &str = "success";

/// External state reported for a failed job.
pub const STATE_FAIL: &str = "fail";

/// Message recorded when the API reports a failure without details.
pub const DEFAULT_FAIL_MESSAGE: &str = "Generation failed";

/// One job record as reported by the generation API.
///
/// Every field is optional on the wire; callers validate what they need.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    /// External job identifier (not the local task id).
    pub task_id: Option<String>,
    pub state: Option<String>,
    /// JSON-encoded string, e.g. `{"resultUrls":["https://..."]}`.
    pub result_json: Option<String>,
    pub fail_msg: Option<String>,
    pub consume_credits: Option<Number>,
    pub cost_time: Option<Number>,
    pub remained_credits: Option<Number>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultPayload {
    #[serde(default)]
    result_urls: Vec<String>,
}

impl JobReport {
    /// Interpret the report as a terminal outcome.
    ///
    /// Returns `Ok(None)` while the external job is still queued or running.
    /// A `resultJson` that is not valid JSON yields a validation error.
    pub fn outcome(&self) -> Result<Option<Outcome>, CoreError> {
        match self.state.as_deref() {
            Some(STATE_SUCCESS) => {
                let urls = parse_result_urls(self.result_json.as_deref())?;
                Ok(Some(Outcome::Succeeded(TaskResult {
                    urls,
                    consume_credits: self.consume_credits.clone(),
                    cost_time: self.cost_time.clone(),
                    remained_credits: self.remained_credits.clone(),
                })))
            }
            Some(STATE_FAIL) => {
                let message = self
                    .fail_msg
                    .as_deref()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_FAIL_MESSAGE);
                Ok(Some(Outcome::Failed(message.to_string())))
            }
            _ => Ok(None),
        }
    }
}

/// Extract `resultUrls` from the API's JSON-encoded result string.
///
/// A missing or empty string, or a payload without `resultUrls`, is an empty
/// list.
pub fn parse_result_urls(result_json: Option<&str>) -> Result<Vec<String>, CoreError> {
    let raw = match result_json.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(Vec::new()),
    };
    let payload: ResultPayload = serde_json::from_str(raw)
        .map_err(|e| CoreError::Validation(format!("Malformed resultJson: {e}")))?;
    Ok(payload.result_urls)
}
