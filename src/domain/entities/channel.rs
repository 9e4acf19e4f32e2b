//! Channel entity.
//!
//! Maps to the `channels` table in the database schema.

use serde::{Deserialize, Serialize};

/// Channel types matching the PostgreSQL ENUM `channel_type`.
///
/// ```sql
/// CREATE TYPE channel_type AS ENUM ('text', 'voice', 'announcement');
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    #[default]
    Text,
    Voice,
    Announcement,
}

impl ChannelType {
    /// Convert from database string representation.
    pub fn from_db(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "voice" => Self::Voice,
            "announcement" => Self::Announcement,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Announcement => "announcement",
        }
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A channel within a server, as listed on `join-server`.
///
/// Maps to the `channels` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - server_id: BIGINT NOT NULL REFERENCES servers(id)
/// - name: VARCHAR(100) NOT NULL
/// - type: channel_type NOT NULL DEFAULT 'text'
/// - topic: TEXT NULL
/// - position: INTEGER NOT NULL DEFAULT 0
/// - last_activity_at: TIMESTAMPTZ NULL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub server_id: i64,
    pub name: String,
    pub channel_type: ChannelType,
    pub topic: Option<String>,
    /// Sort position within the server (ascending)
    pub position: i32,
}
