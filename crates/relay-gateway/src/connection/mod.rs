//! Connection management
//!
//! Per-connection state and the lifecycle that moves connections through it.

mod connection;
mod lifecycle;

pub use connection::{Connection, ConnectionId, ConnectionState};
pub use lifecycle::ConnectionLifecycle;
