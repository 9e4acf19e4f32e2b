//! Message Reaction entity.
//!
//! Maps to the `message_reactions` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents one user's reaction on a message.
///
/// Maps to the `message_reactions` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - message_id: BIGINT NOT NULL REFERENCES messages(id)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - emoji: VARCHAR(100) NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - UNIQUE (message_id, user_id, emoji)
///
/// The unique constraint ensures one reaction per user per emoji per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: i64,
    pub message_id: i64,
    /// User who reacted
    pub author_id: i64,
    /// Unicode emoji or custom emoji identifier
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of toggling a `(user, message, emoji)` reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionToggle {
    /// The row did not exist and was created
    Applied,
    /// The row existed and was deleted
    Removed,
}
