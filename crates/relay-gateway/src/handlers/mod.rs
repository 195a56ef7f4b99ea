//! Client event handlers
//!
//! Routes decoded client events to their handler. A failed event is
//! answered with an `error` event on the same connection and never closes it.

mod error;
mod heartbeat;
mod history;
mod messages;
mod rooms;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use history::HistoryHandler;
pub use messages::MessageHandler;
pub use rooms::RoomHandler;

use crate::connection::Connection;
use crate::engine::RelayEngine;
use crate::error::RelayError;
use crate::protocol::{ClientEvent, ServerEvent};

/// Dispatch incoming client events to appropriate handlers
pub struct EventDispatcher;

impl EventDispatcher {
    /// Handle one client event, replying with an error event if it fails
    pub async fn dispatch(engine: &RelayEngine, connection: &Connection, event: ClientEvent) {
        let name = event.name();
        tracing::trace!(connection_id = %connection.id(), event = name, "Received event");

        let result = match event {
            ClientEvent::JoinRoom(request) => RoomHandler::join(engine, connection, request),
            ClientEvent::LeaveRoom(request) => RoomHandler::leave(engine, connection, request),
            ClientEvent::SendRoomMessage(request) => {
                MessageHandler::room(engine, connection, request).await
            }
            ClientEvent::SendDirectMessage(request) => {
                MessageHandler::direct(engine, connection, request).await
            }
            ClientEvent::FetchRoomHistory(request) => {
                HistoryHandler::room(engine, connection, request).await
            }
            ClientEvent::FetchDirectHistory(request) => {
                HistoryHandler::direct(engine, connection, request).await
            }
            ClientEvent::Ping => {
                HeartbeatHandler::handle(engine, connection);
                Ok(())
            }
        };

        if let Err(e) = result {
            Self::report(engine, connection, name, &e);
        }
    }

    /// Send `err` to the originating connection only
    pub fn report(engine: &RelayEngine, connection: &Connection, event: &str, err: &RelayError) {
        if err.is_client_error() {
            tracing::debug!(connection_id = %connection.id(), event, error = %err, "Event rejected");
        } else {
            tracing::warn!(
                connection_id = %connection.id(),
                event,
                kind = %err.kind(),
                error = %err,
                "Event failed"
            );
        }
        engine.reply(connection, ServerEvent::error(err));
    }
}
