//! Relays task events from the event bus to WebSocket clients.

pub mod forwarder;

pub use forwarder::TaskEventForwarder;
