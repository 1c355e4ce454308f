use std::sync::Arc;

use vidgen_engine::Engine;

use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Task scheduler owning the task store.
    pub engine: Arc<Engine>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
}
