//! WebSocket push of task events.
//!
//! Provides connection management, heartbeat pings and the HTTP upgrade
//! handler mounted at `/api/ws`.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::{initial_data_frame, ws_handler};
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
pub use manager::WsManager;
