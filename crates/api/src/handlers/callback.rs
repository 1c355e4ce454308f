//! Webhook endpoint called by the generation API when a job finishes.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use vidgen_core::JobReport;

use crate::error::{AppError, AppResult};
use crate::response::MessageResponse;
use crate::state::AppState;

/// Callback body: `{ "code": ..., "msg": ..., "data": { "taskId": ..., ... } }`.
#[derive(Debug, Deserialize)]
pub struct CallbackPayload {
    #[serde(default)]
    pub data: Option<JobReport>,
}

/// POST /api/callback
///
/// `400` when `data` or `data.taskId` is missing or `resultJson` is not
/// valid JSON, `404` when no task carries the reported job id.
pub async fn receive_callback(
    State(state): State<AppState>,
    payload: Result<Json<CallbackPayload>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let Json(payload) = payload?;
    let report = payload
        .data
        .ok_or_else(|| AppError::BadRequest("Invalid callback data".into()))?;

    let applied = state.engine.handle_callback(report).await?;

    let message = if applied {
        "Callback processed"
    } else {
        "Callback acknowledged"
    };
    Ok(Json(MessageResponse::new(message)))
}
