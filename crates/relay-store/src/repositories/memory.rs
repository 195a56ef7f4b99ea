//! In-process MessageStore
//!
//! Same contract as the PostgreSQL store, kept in a vector. Messages are
//! appended in id order, so iterating backwards yields newest first.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use relay_core::entities::{ChatMessage, NewMessage};
use relay_core::traits::{HistoryQuery, MessageStore, StoreResult};
use relay_core::value_objects::{MessageIdGenerator, RoomId, UserId};

#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<ChatMessage>>,
    ids: MessageIdGenerator,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages stored
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Copy of every stored message, oldest first
    pub fn all(&self) -> Vec<ChatMessage> {
        self.messages.read().clone()
    }

    fn page<F>(&self, query: HistoryQuery, predicate: F) -> Vec<ChatMessage>
    where
        F: Fn(&ChatMessage) -> bool,
    {
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(0);

        self.messages
            .read()
            .iter()
            .rev()
            .filter(|m| predicate(m))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: NewMessage) -> StoreResult<ChatMessage> {
        // id generation and push happen under one write lock to keep the vector id-ordered
        let mut messages = self.messages.write();
        let persisted = message.into_persisted(self.ids.generate(), Utc::now());
        messages.push(persisted.clone());

        tracing::trace!(message_id = %persisted.id, "Message stored in memory");

        Ok(persisted)
    }

    async fn query_by_room(
        &self,
        room_id: &RoomId,
        query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>> {
        Ok(self.page(query, |m| m.room_id() == Some(room_id)))
    }

    async fn query_by_participants(
        &self,
        a: &UserId,
        b: &UserId,
        query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>> {
        Ok(self.page(query, |m| m.is_between(a, b)))
    }
}
