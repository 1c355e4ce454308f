//! REST API client for the Kie.ai job endpoints.
//!
//! Wraps job creation (`POST /api/v1/jobs/createTask`) and job lookup
//! (`GET /api/v1/jobs/recordInfo`) using [`reqwest`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vidgen_core::{JobReport, JobSubmitter, SubmissionError, TaskOptions};

use crate::config::KieConfig;

/// Application-level success code inside the Kie.ai response envelope.
const CODE_OK: i64 = 200;

/// HTTP client for the Kie.ai API.
pub struct KieApi {
    client: reqwest::Client,
    config: KieConfig,
}

/// Body of `POST /api/v1/jobs/createTask`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest<'a> {
    pub model: &'a str,
    pub call_back_url: &'a str,
    pub input: CreateTaskInput<'a>,
}

#[derive(Debug, Serialize)]
pub struct CreateTaskInput<'a> {
    pub prompt: &'a str,
    pub aspect_ratio: &'static str,
    pub remove_watermark: bool,
}

/// Envelope wrapping every Kie.ai JSON response.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTask {
    pub task_id: String,
}

/// Errors from the Kie.ai REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum KieApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Kie.ai returned a non-2xx status code.
    #[error("Kie.ai API error ({status}): {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Kie.ai answered 2xx but the envelope code signals a failure.
    #[error("Kie.ai rejected the request ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// The envelope reported success without a `data` object.
    #[error("Kie.ai response is missing its data field")]
    MissingData,
}

impl From<KieApiError> for SubmissionError {
    fn from(err: KieApiError) -> Self {
        match err {
            KieApiError::Rejected { code, message } => SubmissionError::Rejected { code, message },
            KieApiError::Request(e) if e.is_decode() => SubmissionError::Malformed(e.to_string()),
            KieApiError::MissingData => SubmissionError::Malformed(err.to_string()),
            KieApiError::Request(_) | KieApiError::HttpStatus { .. } => {
                SubmissionError::Transport(err.to_string())
            }
        }
    }
}

impl KieApi {
    /// Create a client with a dedicated connection pool and the configured
    /// request timeout.
    pub fn new(config: KieConfig) -> Result<Self, KieApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Build the job creation body for a prompt.
    pub fn create_request<'a>(
        &'a self,
        prompt: &'a str,
        options: &TaskOptions,
    ) -> CreateTaskRequest<'a> {
        CreateTaskRequest {
            model: &self.config.model,
            call_back_url: &self.config.callback_url,
            input: CreateTaskInput {
                prompt,
                aspect_ratio: options.aspect_ratio.as_str(),
                remove_watermark: options.remove_watermark,
            },
        }
    }

    /// Queue a text-to-video job.
    ///
    /// Returns the Kie.ai task id used to correlate callbacks.
    pub async fn create_task(
        &self,
        prompt: &str,
        options: &TaskOptions,
    ) -> Result<String, KieApiError> {
        let response = self
            .client
            .post(format!("{}/api/v1/jobs/createTask", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&self.create_request(prompt, options))
            .send()
            .await?;

        let created: CreatedTask = Self::parse_envelope(response).await?;
        Ok(created.task_id)
    }

    /// Retrieve the current record of a job.
    pub async fn record_info(&self, kie_task_id: &str) -> Result<JobReport, KieApiError> {
        let response = self
            .client
            .get(format!("{}/api/v1/jobs/recordInfo", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .query(&[("taskId", kie_task_id)])
            .send()
            .await?;

        Self::parse_envelope(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`KieApiError::HttpStatus`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, KieApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(KieApiError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful response body and unwrap its envelope.
    async fn parse_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, KieApiError> {
        let response = Self::ensure_success(response).await?;
        let envelope = response.json::<ApiEnvelope<T>>().await?;
        unwrap_envelope(envelope)
    }
}

/// Turn a decoded envelope into its payload, mapping non-200 codes to
/// [`KieApiError::Rejected`].
pub fn unwrap_envelope<T>(envelope: ApiEnvelope<T>) -> Result<T, KieApiError> {
    if envelope.code != CODE_OK {
        return Err(KieApiError::Rejected {
            code: envelope.code,
            message: envelope
                .msg
                .unwrap_or_else(|| "Failed to create task".to_string()),
        });
    }
    envelope.data.ok_or(KieApiError::MissingData)
}

#[async_trait]
impl JobSubmitter for KieApi {
    async fn submit(&self, prompt: &str, options: &TaskOptions) -> Result<String, SubmissionError> {
        match self.create_task(prompt, options).await {
            Ok(task_id) => {
                tracing::debug!(kie_task_id = %task_id, "Kie.ai accepted job");
                Ok(task_id)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error creating Kie.ai video task");
                Err(e.into())
            }
        }
    }

    async fn query(&self, external_job_id: &str) -> Result<JobReport, SubmissionError> {
        self.record_info(external_job_id).await.map_err(|e| {
            tracing::warn!(kie_task_id = external_job_id, error = %e, "Kie.ai status query failed");
            e.into()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
