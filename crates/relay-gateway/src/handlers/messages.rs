//! Send handlers
//!
//! Acknowledge successful sends to the sender. Fan-out and direct delivery
//! already happened inside the engine by the time these reply.

use crate::connection::Connection;
use crate::engine::RelayEngine;
use crate::error::RelayResult;
use crate::protocol::{SendDirectMessage, SendRoomMessage, ServerEvent};
use crate::routing::DirectDelivery;
use relay_core::{RoomId, UserId};

/// Handles `send_room_message` and `send_direct_message`
pub struct MessageHandler;

impl MessageHandler {
    pub async fn room(
        engine: &RelayEngine,
        connection: &Connection,
        request: SendRoomMessage,
    ) -> RelayResult<()> {
        let claimed = request.claimed_sender();
        let delivery = engine
            .send_room_message(
                connection,
                RoomId::new(request.room_id),
                request.content,
                claimed,
            )
            .await?;

        engine.reply(
            connection,
            ServerEvent::message_sent(&delivery.message, delivery.recipients),
        );
        Ok(())
    }

    pub async fn direct(
        engine: &RelayEngine,
        connection: &Connection,
        request: SendDirectMessage,
    ) -> RelayResult<()> {
        let receiver = UserId::new(request.receiver_id);
        let delivery = engine
            .send_direct_message(connection, receiver.clone(), request.content)
            .await?;

        let status = match &delivery {
            DirectDelivery::Delivered { message } => ServerEvent::delivered(message, &receiver),
            DirectDelivery::RecipientOffline { message } => {
                ServerEvent::recipient_offline(message, &receiver)
            }
        };
        engine.reply(connection, status);
        Ok(())
    }
}
