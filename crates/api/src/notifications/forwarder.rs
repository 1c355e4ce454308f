//! Event-to-WebSocket forwarding.
//!
//! [`TaskEventForwarder`] subscribes to the event bus and pushes every
//! [`TaskEvent`] to all connected WebSocket clients as a JSON text frame.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use vidgen_events::TaskEvent;

use crate::ws::WsManager;

pub struct TaskEventForwarder {
    ws_manager: Arc<WsManager>,
}

impl TaskEventForwarder {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run until `cancel` fires or the bus is closed.
    ///
    /// A lagging receiver skips the dropped events; clients re-derive state
    /// from the next snapshot they fetch.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<TaskEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Task event forwarder shutting down");
                    break;
                }
                received = receiver.recv() => received,
            };

            match received {
                Ok(event) => self.forward(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Task event forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, task event forwarder shutting down");
                    break;
                }
            }
        }
    }

    async fn forward(&self, event: &TaskEvent) {
        match event.to_json() {
            Ok(json) => {
                let delivered = self.ws_manager.broadcast(Message::Text(json.into())).await;
                tracing::trace!(
                    task_id = %event.task.id(),
                    event_type = event.event_type,
                    delivered,
                    "Task event forwarded",
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    task_id = %event.task.id(),
                    event_type = event.event_type,
                    "Failed to encode task event",
                );
            }
        }
    }
}
