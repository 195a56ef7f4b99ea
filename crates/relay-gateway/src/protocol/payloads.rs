//! Event payload definitions
//!
//! Data structures carried in the `data` field of client and server events.

use chrono::{DateTime, Utc};
use relay_core::{ChatMessage, MessageId, RoomId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorKind;

// === Client payloads ===

/// Join or leave a room
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRequest {
    #[serde(default)]
    pub room_id: String,
}

/// Send a message to a room
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendRoomMessage {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub content: String,
    /// Client-claimed sender. Never trusted; kept for diagnostics only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Value>,
}

impl SendRoomMessage {
    /// Claimed sender rendered as a string, whatever JSON type the client used
    pub fn claimed_sender(&self) -> Option<String> {
        self.sender_id.as_ref().map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Send a direct message to one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendDirectMessage {
    #[serde(default)]
    pub receiver_id: String,
    #[serde(default)]
    pub content: String,
}

/// Page through a room's history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomHistoryRequest {
    #[serde(default)]
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

/// Page through the direct conversation with another user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectHistoryRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

// === Server payloads ===

/// Informational text for one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemNotice {
    pub message: String,
}

impl SystemNotice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A persisted message as seen by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatMessage> for MessagePayload {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender.clone(),
            room_id: message.room_id().cloned(),
            receiver_id: message.receiver().cloned(),
            content: message.content.clone(),
            timestamp: message.created_at,
        }
    }
}

/// Acknowledgement for a routed room message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSentPayload {
    pub message: MessagePayload,
    /// Members the message was fanned out to
    pub recipients: usize,
}

/// Outcome of a direct message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    RecipientOffline,
}

/// Acknowledgement for a direct message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStatusPayload {
    pub status: DeliveryStatus,
    pub message_id: MessageId,
    pub receiver_id: UserId,
    pub info: String,
}

/// Which conversation a history page belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryScope {
    Room { room_id: RoomId },
    Direct { user_id: UserId },
}

/// One page of history, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPayload {
    pub scope: HistoryScope,
    pub messages: Vec<MessagePayload>,
}

impl HistoryPayload {
    pub fn new(scope: HistoryScope, messages: &[ChatMessage]) -> Self {
        Self {
            scope,
            messages: messages.iter().map(MessagePayload::from).collect(),
        }
    }
}

/// Error reported to the originating connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub message: String,
}
