//! Chat message entity - an immutable, persisted message

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::value_objects::{MessageId, RoomId, UserId};

/// Where a message is addressed
///
/// A message is either room-scoped or direct, never both and never neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageTarget {
    /// Broadcast to the members of a room
    Room(RoomId),
    /// Point-to-point to a single user
    Direct(UserId),
}

impl MessageTarget {
    /// Rebuild a target from the nullable storage columns
    ///
    /// # Errors
    /// Returns `InvalidRecord` unless exactly one of the two is present.
    pub fn from_columns(
        room_id: Option<String>,
        receiver_id: Option<String>,
    ) -> Result<Self, DomainError> {
        match (room_id, receiver_id) {
            (Some(room), None) => Ok(Self::Room(RoomId::new(room))),
            (None, Some(receiver)) => Ok(Self::Direct(UserId::new(receiver))),
            (Some(_), Some(_)) => Err(DomainError::InvalidRecord(
                "message has both a room and a receiver".to_string(),
            )),
            (None, None) => Err(DomainError::InvalidRecord(
                "message has neither a room nor a receiver".to_string(),
            )),
        }
    }

    #[inline]
    pub fn room_id(&self) -> Option<&RoomId> {
        match self {
            Self::Room(room) => Some(room),
            Self::Direct(_) => None,
        }
    }

    #[inline]
    pub fn receiver(&self) -> Option<&UserId> {
        match self {
            Self::Direct(user) => Some(user),
            Self::Room(_) => None,
        }
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct(_))
    }
}

/// A validated send request, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender: UserId,
    pub target: MessageTarget,
    pub content: String,
}

impl NewMessage {
    pub fn room(sender: UserId, room_id: RoomId, content: impl Into<String>) -> Self {
        Self {
            sender,
            target: MessageTarget::Room(room_id),
            content: content.into(),
        }
    }

    pub fn direct(sender: UserId, receiver: UserId, content: impl Into<String>) -> Self {
        Self {
            sender,
            target: MessageTarget::Direct(receiver),
            content: content.into(),
        }
    }

    /// Attach the store-assigned id and timestamp
    pub fn into_persisted(self, id: MessageId, created_at: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id,
            sender: self.sender,
            target: self.target,
            content: self.content,
            created_at,
        }
    }
}

/// Chat message entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: UserId,
    pub target: MessageTarget,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    #[inline]
    pub fn room_id(&self) -> Option<&RoomId> {
        self.target.room_id()
    }

    #[inline]
    pub fn receiver(&self) -> Option<&UserId> {
        self.target.receiver()
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        self.target.is_direct()
    }

    /// Check if this is a direct message exchanged between `a` and `b`, in either direction
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        match self.receiver() {
            Some(receiver) => {
                (&self.sender == a && receiver == b) || (&self.sender == b && receiver == a)
            }
            None => false,
        }
    }

    /// Get a truncated preview of the message (for logs)
    pub fn preview(&self, max_len: usize) -> &str {
        if self.content.len() <= max_len {
            &self.content
        } else {
            let mut end = max_len;
            while !self.content.is_char_boundary(end) && end > 0 {
                end -= 1;
            }
            &self.content[..end]
        }
    }
}
