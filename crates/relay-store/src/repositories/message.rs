//! PostgreSQL implementation of MessageStore

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

use relay_core::entities::{ChatMessage, MessageTarget, NewMessage};
use relay_core::traits::{HistoryQuery, MessageStore, StoreResult};
use relay_core::value_objects::{MessageIdGenerator, RoomId, UserId};

use crate::models::ChatMessageModel;

use super::error::map_db_error;

/// PostgreSQL implementation of MessageStore
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
    ids: Arc<MessageIdGenerator>,
}

impl PgMessageStore {
    /// Create a new PgMessageStore
    pub fn new(pool: PgPool, ids: MessageIdGenerator) -> Self {
        Self {
            pool,
            ids: Arc::new(ids),
        }
    }

    fn into_entities(rows: Vec<ChatMessageModel>) -> StoreResult<Vec<ChatMessage>> {
        rows.into_iter().map(ChatMessage::try_from).collect()
    }
}

impl std::fmt::Debug for PgMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgMessageStore")
            .field("worker_id", &self.ids.worker_id())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    #[instrument(skip(self, message), fields(sender = %message.sender))]
    async fn append(&self, message: NewMessage) -> StoreResult<ChatMessage> {
        let id = self.ids.generate();
        let (room_id, receiver_id) = match &message.target {
            MessageTarget::Room(room) => (Some(room.as_str()), None),
            MessageTarget::Direct(receiver) => (None, Some(receiver.as_str())),
        };

        let row = sqlx::query_as::<_, ChatMessageModel>(
            r#"
            INSERT INTO chat_messages (id, sender_id, receiver_id, room_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sender_id, receiver_id, room_id, content, created_at
            "#,
        )
        .bind(id.into_inner())
        .bind(message.sender.as_str())
        .bind(receiver_id)
        .bind(room_id)
        .bind(&message.content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        ChatMessage::try_from(row)
    }

    #[instrument(skip(self))]
    async fn query_by_room(
        &self,
        room_id: &RoomId,
        query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageModel>(
            r#"
            SELECT id, sender_id, receiver_id, room_id, content, created_at
            FROM chat_messages
            WHERE room_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(room_id.as_str())
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::into_entities(rows)
    }

    #[instrument(skip(self))]
    async fn query_by_participants(
        &self,
        a: &UserId,
        b: &UserId,
        query: HistoryQuery,
    ) -> StoreResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, ChatMessageModel>(
            r#"
            SELECT id, sender_id, receiver_id, room_id, content, created_at
            FROM chat_messages
            WHERE room_id IS NULL
              AND ((sender_id = $1 AND receiver_id = $2)
                OR (sender_id = $2 AND receiver_id = $1))
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(a.as_str())
        .bind(b.as_str())
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Self::into_entities(rows)
    }
}
