//! Handlers for the `/tasks` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use vidgen_core::{CoreError, TaskId, TaskOptions, TaskStatus};

use crate::error::{AppError, AppResult};
use crate::response::{MessageResponse, TaskListResponse, TaskResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /tasks`.
///
/// `prompt` is kept as raw JSON so a missing or non-string value can be
/// reported with a specific message instead of a generic decode error.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub options: Option<TaskOptions>,
}

/// Body of `POST /tasks/batch`.
#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    #[serde(default)]
    pub prompts: Option<Value>,
    #[serde(default)]
    pub options: Option<TaskOptions>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a task id from the path. Anything that is not a UUID cannot name a
/// stored task, so it is reported as not found.
fn parse_task_id(raw: &str) -> AppResult<TaskId> {
    raw.parse::<TaskId>()
        .map_err(|_| AppError::Core(CoreError::task_not_found(raw)))
}

fn batch_prompts(value: Option<&Value>) -> AppResult<Vec<String>> {
    let items = value
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or_else(|| AppError::BadRequest("Prompts array is required".into()))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                AppError::BadRequest(format!("Prompt at index {index} must be a string"))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// POST /tasks
// ---------------------------------------------------------------------------

/// POST /api/tasks
///
/// Queue a single prompt. Responds `201` with the new `pending` task.
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;

    let prompt = input
        .prompt
        .as_ref()
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Prompt is required and must be a string".into()))?;

    let task = state
        .engine
        .submit(prompt, input.options.unwrap_or_default())
        .await?;

    Ok((StatusCode::CREATED, Json(TaskResponse { task })))
}

// ---------------------------------------------------------------------------
// POST /tasks/batch
// ---------------------------------------------------------------------------

/// POST /api/tasks/batch
///
/// Queue several prompts with shared options. Nothing is created unless every
/// prompt is valid.
pub async fn create_batch(
    State(state): State<AppState>,
    payload: Result<Json<CreateBatchRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    let prompts = batch_prompts(input.prompts.as_ref())?;

    let tasks = state
        .engine
        .submit_batch(&prompts, input.options.unwrap_or_default())
        .await?;

    Ok((StatusCode::CREATED, Json(TaskListResponse { tasks })))
}

// ---------------------------------------------------------------------------
// GET /tasks
// ---------------------------------------------------------------------------

/// GET /api/tasks
///
/// All tasks, newest first.
pub async fn list_tasks(State(state): State<AppState>) -> Json<TaskListResponse> {
    Json(TaskListResponse {
        tasks: state.engine.list().await,
    })
}

// ---------------------------------------------------------------------------
// GET /tasks/{id}
// ---------------------------------------------------------------------------

/// GET /api/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<TaskResponse>> {
    let id = parse_task_id(&id)?;
    let task = state.engine.get(id).await?;
    Ok(Json(TaskResponse { task }))
}

// ---------------------------------------------------------------------------
// DELETE /tasks/{id}
// ---------------------------------------------------------------------------

/// DELETE /api/tasks/{id}
///
/// Cancel an active task. Repeating the call, or calling it on a task that
/// is not active, answers `200` without changing anything.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_task_id(&id)?;
    let task = state.engine.cancel(id).await?;

    let message = match task.status() {
        TaskStatus::Cancelled => "Task cancelled".to_string(),
        status => format!("Task is {status}; nothing to cancel"),
    };
    Ok(Json(MessageResponse::new(message)))
}
