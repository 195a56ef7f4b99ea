//! Connection lifecycle
//!
//! Drives each connection through connect, room membership changes and
//! disconnect. Registry writes that depend on the connection's state happen
//! while holding that connection's state lock, so a disconnect racing a
//! join or an activation can never leave an entry behind. Lock order is
//! always connection, then registry.

use super::Connection;
use crate::delivery::OutboundHub;
use crate::error::{RelayError, RelayResult};
use crate::protocol::ServerEvent;
use crate::registry::{PresenceRegistry, RoomRegistry};
use relay_core::{Authenticator, ConnectContext, RoomId};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Connect, membership and disconnect handling
pub struct ConnectionLifecycle {
    presence: Arc<PresenceRegistry>,
    rooms: Arc<RoomRegistry>,
    outbound: Arc<OutboundHub>,
    authenticator: Arc<dyn Authenticator>,
    allow_anonymous: bool,
}

impl ConnectionLifecycle {
    pub fn new(
        presence: Arc<PresenceRegistry>,
        rooms: Arc<RoomRegistry>,
        outbound: Arc<OutboundHub>,
        authenticator: Arc<dyn Authenticator>,
        allow_anonymous: bool,
    ) -> Self {
        Self {
            presence,
            rooms,
            outbound,
            authenticator,
            allow_anonymous,
        }
    }

    /// Authenticate a new connection and make it `Active`
    ///
    /// On success the connection's identity (if any) is registered in
    /// presence, superseding any older connection for the same identity.
    /// On failure the connection is already `Closed` and holds no entries.
    pub async fn connect(
        &self,
        context: &ConnectContext,
        sender: mpsc::Sender<ServerEvent>,
    ) -> RelayResult<Arc<Connection>> {
        let connection = Connection::new();
        self.outbound.attach(connection.id(), sender);

        let identity = match self.authenticator.resolve(context).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    remote_addr = ?context.remote_addr,
                    error = %e,
                    "Connection rejected by authenticator"
                );
                self.disconnect(&connection);
                return Err(RelayError::AuthFailure(e));
            }
        };

        if identity.is_none() && !self.allow_anonymous {
            tracing::debug!(connection_id = %connection.id(), "Anonymous connection refused");
            self.disconnect(&connection);
            return Err(RelayError::Unauthenticated);
        }

        let activated = connection.activate(identity.clone(), || {
            if let Some(user) = &identity {
                self.presence.register(user.clone(), connection.id());
            }
        });
        if !activated {
            return Err(RelayError::InvalidState(connection.state()));
        }

        tracing::info!(
            connection_id = %connection.id(),
            user_id = identity.as_ref().map_or("anonymous", |u| u.as_str()),
            "Connection active"
        );

        Ok(connection)
    }

    /// Close the connection and remove every trace of it
    ///
    /// Idempotent: only the first call performs cleanup and returns `true`.
    pub fn disconnect(&self, connection: &Connection) -> bool {
        if !connection.close() {
            tracing::trace!(connection_id = %connection.id(), "Disconnect already handled");
            return false;
        }

        let identity = self.presence.unregister(connection.id());
        let rooms = self.rooms.leave_all(connection.id());
        self.outbound.detach(connection.id());

        tracing::info!(
            connection_id = %connection.id(),
            user_id = identity.as_ref().map(|u| u.as_str()),
            rooms_left = rooms.len(),
            connected_for_ms = connection.age().as_millis(),
            "Connection closed"
        );

        true
    }

    /// Add an `Active` connection to a room
    pub fn join_room(&self, connection: &Connection, room: &RoomId) -> RelayResult<bool> {
        if room.is_blank() {
            return Err(RelayError::validation("room_id is required"));
        }

        let joined = connection
            .while_active(|| self.rooms.join(room, connection.id()))
            .map_err(RelayError::InvalidState)?;

        tracing::debug!(connection_id = %connection.id(), room_id = %room, joined, "Join room");
        Ok(joined)
    }

    /// Remove an `Active` connection from a room
    pub fn leave_room(&self, connection: &Connection, room: &RoomId) -> RelayResult<bool> {
        if room.is_blank() {
            return Err(RelayError::validation("room_id is required"));
        }

        let left = connection
            .while_active(|| self.rooms.leave(room, connection.id()))
            .map_err(RelayError::InvalidState)?;

        tracing::debug!(connection_id = %connection.id(), room_id = %room, left, "Leave room");
        Ok(left)
    }
}

impl std::fmt::Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLifecycle")
            .field("allow_anonymous", &self.allow_anonymous)
            .finish_non_exhaustive()
    }
}
