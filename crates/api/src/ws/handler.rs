use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use vidgen_core::task_events::MSG_TYPE_INITIAL_DATA;
use vidgen_core::Task;
use vidgen_engine::Engine;

use crate::state::AppState;
use crate::ws::manager::WsManager;

#[derive(Serialize)]
struct InitialData<'a> {
    #[serde(rename = "type")]
    event_type: &'static str,
    tasks: &'a [Task],
}

/// Encode the snapshot frame sent to a client right after it connects.
pub fn initial_data_frame(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string(&InitialData {
        event_type: MSG_TYPE_INITIAL_DATA,
        tasks,
    })
}

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, state.engine))
}

/// Manage a single WebSocket connection after upgrade.
///
/// The connection is registered before the snapshot is taken, so an event
/// published in between reaches the client (possibly twice) rather than
/// being lost.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, engine: Arc<Engine>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone()).await;

    match initial_data_frame(&engine.list().await) {
        Ok(frame) => {
            ws_manager.send_to(&conn_id, Message::Text(frame.into())).await;
        }
        Err(e) => {
            tracing::error!(conn_id = %conn_id, error = %e, "Failed to encode initial data");
        }
    }

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            // Clients only listen; anything else they send is ignored.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
