//! Identity entity.
//!
//! The authenticated principal behind a gateway connection, and the author
//! profile attached to hydrated messages.

use serde::{Deserialize, Serialize};

/// Alias shown for anonymous identities that never picked one.
pub const DEFAULT_ANONYMOUS_ALIAS: &str = "Anonymous";

/// Maps to a row of the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - username: VARCHAR(32) NOT NULL UNIQUE
/// - anonymous_alias: VARCHAR(32) NULL
/// - is_anonymous: BOOLEAN NOT NULL DEFAULT FALSE
/// - is_admin: BOOLEAN NOT NULL DEFAULT FALSE
///
/// The display name is never stored resolved; call [`Identity::display_name`]
/// each time an outbound event is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub anonymous_alias: Option<String>,
    pub anonymous: bool,
    pub is_admin: bool,
}

impl Identity {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            anonymous_alias: None,
            anonymous: false,
            is_admin: false,
        }
    }

    /// Resolve the name other users see.
    pub fn display_name(&self) -> &str {
        if self.anonymous {
            self.anonymous_alias
                .as_deref()
                .filter(|alias| !alias.is_empty())
                .unwrap_or(DEFAULT_ANONYMOUS_ALIAS)
        } else {
            &self.username
        }
    }
}
