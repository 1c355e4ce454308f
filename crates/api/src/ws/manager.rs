use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use vidgen_core::Timestamp;

/// Outbound half of a client's message channel.
pub type WsSender = mpsc::UnboundedSender<Message>;

pub struct WsConnection {
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

/// Registry of connected dashboard clients, keyed by connection id.
///
/// Shared as `Arc<WsManager>` between the upgrade handler, the task event
/// forwarder and the heartbeat.
#[derive(Default)]
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client and hand back the receiver its socket task drains.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (sender, rx) = mpsc::unbounded_channel();
        let connected_at = chrono::Utc::now();
        self.connections
            .write()
            .await
            .insert(conn_id, WsConnection { sender, connected_at });
        rx
    }

    pub async fn remove(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.remove(conn_id) {
            let lifetime = chrono::Utc::now() - conn.connected_at;
            tracing::debug!(conn_id, secs = lifetime.num_seconds(), "Connection removed");
        }
    }

    /// Queue a message for one client. `false` if the client is gone.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        match self.connections.read().await.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Queue a message for every client. Returns how many channels accepted
    /// it; closed channels are left for their socket task to remove.
    pub async fn broadcast(&self, message: Message) -> usize {
        fan_out(&*self.connections.read().await, &message)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn ping_all(&self) {
        let delivered = self.broadcast(Message::Ping(Bytes::new())).await;
        tracing::trace!(delivered, "Heartbeat ping sent");
    }

    /// Queue a Close frame for every client and forget them all.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let closed = fan_out(&conns, &Message::Close(None));
        conns.clear();
        tracing::info!(closed, "Closed all WebSocket connections");
    }
}

fn fan_out(conns: &HashMap<String, WsConnection>, message: &Message) -> usize {
    conns
        .values()
        .filter(|conn| conn.sender.send(message.clone()).is_ok())
        .count()
}
