//! vidgen event bus.
//!
//! Every task mutation is published as a [`TaskEvent`] on the in-process
//! [`EventBus`]. Observers (the WebSocket forwarder in `vidgen-api`, tests)
//! subscribe independently; delivery is best-effort and lagging receivers
//! drop events rather than block publishers.

pub mod bus;

pub use bus::{EventBus, TaskEvent};
