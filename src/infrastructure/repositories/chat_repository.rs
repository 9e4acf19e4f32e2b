//! Chat Repository Implementation
//!
//! PostgreSQL implementation of every persistence call the gateway makes:
//! membership checks, channel listing, message history and creation, and
//! reaction toggles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    Attachment, Channel, ChannelType, ChatRepository, Identity, Message, MessageType, NewMessage,
    Reaction, ReactionToggle,
};
use crate::shared::error::StoreError;
use crate::shared::snowflake::SnowflakeGenerator;

/// PostgreSQL chat repository.
pub struct PgChatRepository {
    pool: PgPool,
    snowflake: Arc<SnowflakeGenerator>,
}

impl PgChatRepository {
    pub fn new(pool: PgPool, snowflake: Arc<SnowflakeGenerator>) -> Self {
        Self { pool, snowflake }
    }

    /// Attachments of the given messages, grouped by message id.
    async fn attachments_for(
        &self,
        message_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Attachment>>, StoreError> {
        if message_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, AttachmentRow>(
            r#"
            SELECT id, message_id, filename, content_type, size, url
            FROM attachments
            WHERE message_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(message_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<Attachment>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.message_id)
                .or_default()
                .push(row.into_attachment());
        }
        Ok(grouped)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    id: i64,
    server_id: i64,
    name: String,
    channel_type: String,
    topic: Option<String>,
    position: i32,
}

impl ChannelRow {
    fn into_channel(self) -> Channel {
        Channel {
            id: self.id,
            server_id: self.server_id,
            name: self.name,
            channel_type: ChannelType::from_db(&self.channel_type),
            topic: self.topic,
            position: self.position,
        }
    }
}

/// Message joined with its author's profile columns.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    channel_id: i64,
    author_id: i64,
    content: String,
    message_type: String,
    created_at: DateTime<Utc>,
    author_username: String,
    author_anonymous_alias: Option<String>,
    author_is_anonymous: bool,
    author_is_admin: bool,
}

impl MessageRow {
    fn into_message(self, attachments: Vec<Attachment>) -> Message {
        Message {
            id: self.id,
            channel_id: self.channel_id,
            author_id: self.author_id,
            content: self.content,
            message_type: MessageType::from_db(&self.message_type),
            created_at: self.created_at,
            author: Identity {
                id: self.author_id,
                username: self.author_username,
                anonymous_alias: self.author_anonymous_alias,
                anonymous: self.author_is_anonymous,
                is_admin: self.author_is_admin,
            },
            attachments,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AttachmentRow {
    id: i64,
    message_id: i64,
    filename: String,
    content_type: Option<String>,
    size: i32,
    url: String,
}

impl AttachmentRow {
    fn into_attachment(self) -> Attachment {
        Attachment {
            id: self.id,
            message_id: self.message_id,
            filename: self.filename,
            content_type: self.content_type,
            size: self.size,
            url: self.url,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReactionRow {
    id: i64,
    message_id: i64,
    user_id: i64,
    emoji: String,
    created_at: DateTime<Utc>,
}

impl ReactionRow {
    fn into_reaction(self) -> Reaction {
        Reaction {
            id: self.id,
            message_id: self.message_id,
            author_id: self.user_id,
            emoji: self.emoji,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn is_server_member(&self, user_id: i64, server_id: i64) -> Result<bool, StoreError> {
        let is_member = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM server_members
                WHERE server_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(server_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(is_member)
    }

    async fn list_channels(&self, server_id: i64) -> Result<Vec<Channel>, StoreError> {
        let rows = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT id, server_id, name, type::text AS channel_type, topic, position
            FROM channels
            WHERE server_id = $1
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChannelRow::into_channel).collect())
    }

    async fn has_channel_access(&self, user_id: i64, channel_id: i64) -> Result<bool, StoreError> {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM channels c
                JOIN server_members m ON m.server_id = c.server_id
                WHERE c.id = $1 AND m.user_id = $2
            )
            "#,
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(allowed)
    }

    async fn list_recent_messages(
        &self,
        channel_id: i64,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, m.channel_id, m.author_id, m.content,
                   m.message_type::text AS message_type, m.created_at,
                   u.username AS author_username,
                   u.anonymous_alias AS author_anonymous_alias,
                   u.is_anonymous AS author_is_anonymous,
                   u.is_admin AS author_is_admin
            FROM messages m
            JOIN users u ON u.id = m.author_id
            WHERE m.channel_id = $1
            ORDER BY m.id DESC
            LIMIT $2
            "#,
        )
        .bind(channel_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut attachments = self.attachments_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let files = attachments.remove(&row.id).unwrap_or_default();
                row.into_message(files)
            })
            .collect())
    }

    async fn create_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        let id = self.snowflake.generate();

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            WITH inserted AS (
                INSERT INTO messages (id, channel_id, author_id, content, message_type)
                VALUES ($1, $2, $3, $4, $5::message_type)
                RETURNING id, channel_id, author_id, content, message_type, created_at
            )
            SELECT i.id, i.channel_id, i.author_id, i.content,
                   i.message_type::text AS message_type, i.created_at,
                   u.username AS author_username,
                   u.anonymous_alias AS author_anonymous_alias,
                   u.is_anonymous AS author_is_anonymous,
                   u.is_admin AS author_is_admin
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(id)
        .bind(message.channel_id)
        .bind(message.author_id)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(message_id = id, channel_id = message.channel_id, "Message stored");
        Ok(row.into_message(Vec::new()))
    }

    async fn touch_channel_activity(&self, channel_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE channels SET last_activity_at = NOW() WHERE id = $1")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_message_channel(&self, message_id: i64) -> Result<Option<i64>, StoreError> {
        let channel_id =
            sqlx::query_scalar::<_, i64>("SELECT channel_id FROM messages WHERE id = $1")
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(channel_id)
    }

    /// Delete-or-insert inside one transaction; the unique constraint on
    /// `(message_id, user_id, emoji)` keeps a concurrent duplicate insert out.
    async fn toggle_reaction(
        &self,
        user_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<ReactionToggle, StoreError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query_scalar::<_, i64>(
            r#"
            DELETE FROM message_reactions
            WHERE message_id = $1 AND user_id = $2 AND emoji = $3
            RETURNING id
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if removed.is_some() {
            ReactionToggle::Removed
        } else {
            sqlx::query(
                r#"
                INSERT INTO message_reactions (id, message_id, user_id, emoji)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (message_id, user_id, emoji) DO NOTHING
                "#,
            )
            .bind(self.snowflake.generate())
            .bind(message_id)
            .bind(user_id)
            .bind(emoji)
            .execute(&mut *tx)
            .await?;
            ReactionToggle::Applied
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_reactions(&self, message_id: i64) -> Result<Vec<Reaction>, StoreError> {
        let rows = sqlx::query_as::<_, ReactionRow>(
            r#"
            SELECT id, message_id, user_id, emoji, created_at
            FROM message_reactions
            WHERE message_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ReactionRow::into_reaction).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
