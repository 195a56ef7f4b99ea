//! Schema bootstrap for the `chat_messages` table
//!
//! Every statement is idempotent, so this runs on each startup.

use sqlx::PgPool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS chat_messages (
        id          BIGINT PRIMARY KEY,
        sender_id   TEXT NOT NULL,
        receiver_id TEXT,
        room_id     TEXT,
        content     TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT chat_messages_exactly_one_target
            CHECK ((room_id IS NULL) <> (receiver_id IS NULL))
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_chat_messages_room
        ON chat_messages (room_id, created_at DESC)
        WHERE room_id IS NOT NULL
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_chat_messages_participants
        ON chat_messages (sender_id, receiver_id, created_at DESC)
        WHERE room_id IS NULL
    "#,
];

/// Create the message table and its indexes if they do not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::debug!("chat_messages schema ensured");
    Ok(())
}
