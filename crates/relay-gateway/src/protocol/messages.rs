//! Relay event format
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Events without a payload omit `data`.

use super::payloads::{
    DeliveryStatus, DirectHistoryRequest, ErrorPayload, HistoryPayload, HistoryScope,
    MessagePayload, MessageSentPayload, MessageStatusPayload, RoomHistoryRequest, RoomRequest,
    SendDirectMessage, SendRoomMessage, SystemNotice,
};
use crate::error::RelayError;
use relay_core::{ChatMessage, UserId};
use serde::{Deserialize, Serialize};

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom(RoomRequest),
    LeaveRoom(RoomRequest),
    SendRoomMessage(SendRoomMessage),
    SendDirectMessage(SendDirectMessage),
    FetchRoomHistory(RoomHistoryRequest),
    FetchDirectHistory(DirectHistoryRequest),
    Ping,
}

impl ClientEvent {
    /// Wire name of the event
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => "join_room",
            Self::LeaveRoom(_) => "leave_room",
            Self::SendRoomMessage(_) => "send_room_message",
            Self::SendDirectMessage(_) => "send_direct_message",
            Self::FetchRoomHistory(_) => "fetch_room_history",
            Self::FetchDirectHistory(_) => "fetch_direct_history",
            Self::Ping => "ping",
        }
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Events sent by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    SystemMessage(SystemNotice),
    NewMessage(MessagePayload),
    NewDm(MessagePayload),
    MessageSent(MessageSentPayload),
    MessageStatus(MessageStatusPayload),
    History(HistoryPayload),
    Error(ErrorPayload),
    Pong,
}

impl ServerEvent {
    // === Constructors ===

    pub fn system(message: impl Into<String>) -> Self {
        Self::SystemMessage(SystemNotice::new(message))
    }

    /// Room fan-out event
    pub fn new_message(message: &ChatMessage) -> Self {
        Self::NewMessage(MessagePayload::from(message))
    }

    /// Direct delivery event
    pub fn new_dm(message: &ChatMessage) -> Self {
        Self::NewDm(MessagePayload::from(message))
    }

    pub fn message_sent(message: &ChatMessage, recipients: usize) -> Self {
        Self::MessageSent(MessageSentPayload {
            message: MessagePayload::from(message),
            recipients,
        })
    }

    pub fn delivered(message: &ChatMessage, receiver: &UserId) -> Self {
        Self::MessageStatus(MessageStatusPayload {
            status: DeliveryStatus::Delivered,
            message_id: message.id,
            receiver_id: receiver.clone(),
            info: format!("Message delivered to {receiver}."),
        })
    }

    pub fn recipient_offline(message: &ChatMessage, receiver: &UserId) -> Self {
        Self::MessageStatus(MessageStatusPayload {
            status: DeliveryStatus::RecipientOffline,
            message_id: message.id,
            receiver_id: receiver.clone(),
            info: format!(
                "User {receiver} is currently offline. Message will be delivered when they next connect."
            ),
        })
    }

    pub fn history(scope: HistoryScope, messages: &[ChatMessage]) -> Self {
        Self::History(HistoryPayload::new(scope, messages))
    }

    pub fn error(err: &RelayError) -> Self {
        Self::Error(ErrorPayload {
            kind: err.kind(),
            message: err.to_string(),
        })
    }

    // === Utilities ===

    /// Wire name of the event
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SystemMessage(_) => "system_message",
            Self::NewMessage(_) => "new_message",
            Self::NewDm(_) => "new_dm",
            Self::MessageSent(_) => "message_sent",
            Self::MessageStatus(_) => "message_status",
            Self::History(_) => "history",
            Self::Error(_) => "error",
            Self::Pong => "pong",
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ServerEvent({})", self.name())
    }
}
