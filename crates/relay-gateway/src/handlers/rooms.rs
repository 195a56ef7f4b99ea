//! Room membership handlers

use crate::connection::Connection;
use crate::engine::RelayEngine;
use crate::error::RelayResult;
use crate::protocol::{RoomRequest, ServerEvent};
use relay_core::RoomId;

/// Handles `join_room` and `leave_room`
pub struct RoomHandler;

impl RoomHandler {
    pub fn join(
        engine: &RelayEngine,
        connection: &Connection,
        request: RoomRequest,
    ) -> RelayResult<()> {
        let room = RoomId::new(request.room_id);
        engine.join_room(connection, &room)?;
        engine.reply(
            connection,
            ServerEvent::system(format!("You have joined room: {room}")),
        );
        Ok(())
    }

    pub fn leave(
        engine: &RelayEngine,
        connection: &Connection,
        request: RoomRequest,
    ) -> RelayResult<()> {
        let room = RoomId::new(request.room_id);
        engine.leave_room(connection, &room)?;
        engine.reply(
            connection,
            ServerEvent::system(format!("You have left room: {room}")),
        );
        Ok(())
    }
}
