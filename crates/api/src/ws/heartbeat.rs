use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Default interval between heartbeat pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn a background task that pings every connected WebSocket client on
/// `interval`.
///
/// The task never ends on its own; abort the returned handle at shutdown.
pub fn start_heartbeat(
    ws_manager: Arc<WsManager>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;
            let count = ws_manager.connection_count().await;
            if count > 0 {
                tracing::debug!(count, "WebSocket heartbeat ping");
                ws_manager.ping_all().await;
            }
        }
    })
}
