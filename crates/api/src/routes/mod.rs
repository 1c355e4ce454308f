pub mod health;
pub mod tasks;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// ```text
/// /ws                 WebSocket push of task events
///
/// /tasks              list (GET), create (POST)
/// /tasks/batch        create many (POST)
/// /tasks/{id}         get (GET), cancel (DELETE)
///
/// /callback           generation API webhook (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/tasks", tasks::router())
        .route("/callback", post(handlers::callback::receive_callback))
}
