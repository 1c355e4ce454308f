//! Route definitions for the `/tasks` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                -> list_tasks
/// POST   /                -> create_task
/// POST   /batch           -> create_batch
/// GET    /{id}            -> get_task
/// DELETE /{id}            -> cancel_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::create_task))
        .route("/batch", post(tasks::create_batch))
        .route("/{id}", get(tasks::get_task).delete(tasks::cancel_task))
}
