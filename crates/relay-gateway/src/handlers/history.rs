//! History handlers

use crate::connection::Connection;
use crate::engine::RelayEngine;
use crate::error::{RelayError, RelayResult};
use crate::protocol::{DirectHistoryRequest, HistoryScope, RoomHistoryRequest, ServerEvent};
use relay_core::{HistoryQuery, RoomId, UserId};

/// Handles `fetch_room_history` and `fetch_direct_history`
pub struct HistoryHandler;

impl HistoryHandler {
    pub async fn room(
        engine: &RelayEngine,
        connection: &Connection,
        request: RoomHistoryRequest,
    ) -> RelayResult<()> {
        Self::ensure_active(connection)?;

        let room = RoomId::new(request.room_id);
        let query = HistoryQuery::new(request.limit, request.offset);
        let messages = engine.room_history(&room, query).await?;

        engine.reply(
            connection,
            ServerEvent::history(HistoryScope::Room { room_id: room }, &messages),
        );
        Ok(())
    }

    /// Conversation between the caller's identity and `user_id`
    pub async fn direct(
        engine: &RelayEngine,
        connection: &Connection,
        request: DirectHistoryRequest,
    ) -> RelayResult<()> {
        Self::ensure_active(connection)?;

        let me = engine
            .presence()
            .identity_of(connection.id())
            .ok_or(RelayError::Unauthenticated)?;
        let other = UserId::new(request.user_id);
        let query = HistoryQuery::new(request.limit, request.offset);
        let messages = engine.direct_history(&me, &other, query).await?;

        engine.reply(
            connection,
            ServerEvent::history(HistoryScope::Direct { user_id: other }, &messages),
        );
        Ok(())
    }

    fn ensure_active(connection: &Connection) -> RelayResult<()> {
        if connection.is_active() {
            Ok(())
        } else {
            Err(RelayError::InvalidState(connection.state()))
        }
    }
}
