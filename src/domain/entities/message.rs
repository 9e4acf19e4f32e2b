//! Message entity.
//!
//! Maps to the `messages` table in the database schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::Identity;

/// Message types matching the PostgreSQL ENUM `message_type`.
///
/// ```sql
/// CREATE TYPE message_type AS ENUM ('text', 'image', 'file');
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// A regular text message
    #[default]
    Text,
    /// A message whose body references an uploaded image
    Image,
    /// A message whose body references an uploaded file
    File,
}

impl MessageType {
    /// Strict parse for client input; unknown names are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    /// Lenient conversion from the database representation.
    pub fn from_db(s: &str) -> Self {
        Self::parse(&s.to_lowercase()).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::File => "file",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// File reference attached to a message. Uploads happen elsewhere; the
/// gateway only relays the stored metadata.
///
/// Maps to the `attachments` table:
/// - id: BIGINT PRIMARY KEY
/// - message_id: BIGINT NOT NULL REFERENCES messages(id)
/// - filename: VARCHAR(255) NOT NULL
/// - content_type: VARCHAR(100) NULL
/// - size: INTEGER NOT NULL
/// - url: TEXT NOT NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub message_id: i64,
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i32,
    pub url: String,
}

/// A persisted message, hydrated with its author profile and attachments.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - channel_id: BIGINT NOT NULL REFERENCES channels(id)
/// - author_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - message_type: message_type NOT NULL DEFAULT 'text'
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub channel_id: i64,
    pub author_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub author: Identity,
    pub attachments: Vec<Attachment>,
}

/// Request to persist a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub author_id: i64,
    pub channel_id: i64,
    pub content: String,
    pub message_type: MessageType,
}
