//! ChatMessage entity <-> model mapper

use relay_core::entities::{ChatMessage, MessageTarget};
use relay_core::error::DomainError;
use relay_core::value_objects::{MessageId, UserId};

use crate::models::ChatMessageModel;

/// Convert a row into a `ChatMessage`, rejecting rows that break the room-xor-receiver rule
impl TryFrom<ChatMessageModel> for ChatMessage {
    type Error = DomainError;

    fn try_from(model: ChatMessageModel) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: MessageId::new(model.id),
            sender: UserId::new(model.sender_id),
            target: MessageTarget::from_columns(model.room_id, model.receiver_id)?,
            content: model.content,
            created_at: model.created_at,
        })
    }
}
