//! Chat message database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the `chat_messages` table
#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageModel {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub room_id: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessageModel {
    /// Check if the row is a direct message
    #[inline]
    pub fn is_direct(&self) -> bool {
        self.receiver_id.is_some()
    }
}
