//! Message store port
//!
//! The relay never opens or manages store connections itself: it only
//! appends validated messages and reads history through this trait.

use async_trait::async_trait;

use crate::entities::{ChatMessage, NewMessage};
use crate::error::DomainError;
use crate::value_objects::{RoomId, UserId};

/// Result type for message store operations
pub type StoreResult<T> = Result<T, DomainError>;

/// Offset pagination for history queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub limit: i64,
    pub offset: i64,
}

impl HistoryQuery {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 100;

    /// Build a query, clamping `limit` to 1..=100 and `offset` to be non-negative
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably append a message, assigning its id and creation timestamp
    async fn append(&self, message: NewMessage) -> StoreResult<ChatMessage>;

    /// Room-scoped messages for `room_id`, newest first
    async fn query_by_room(&self, room_id: &RoomId, query: HistoryQuery)
        -> StoreResult<Vec<ChatMessage>>;

    /// Direct messages exchanged between `a` and `b` in either direction, newest first
    async fn query_by_participants(
        &self,
        a: &UserId,
        b: &UserId,
        query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>>;
}
