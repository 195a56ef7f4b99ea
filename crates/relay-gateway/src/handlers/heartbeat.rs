//! Heartbeat handler

use crate::connection::Connection;
use crate::engine::RelayEngine;
use crate::protocol::ServerEvent;

/// Handles application-level `ping`
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// The socket loop already refreshed the idle timer; answer with `pong`
    pub fn handle(engine: &RelayEngine, connection: &Connection) {
        tracing::trace!(
            connection_id = %connection.id(),
            idle_ms = connection.idle_for().as_millis(),
            "Ping received"
        );
        engine.reply(connection, ServerEvent::Pong);
    }
}
