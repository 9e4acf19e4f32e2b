//! Collaborator contracts.
//!
//! The gateway owns no durable state. Membership, history and reactions
//! live behind [`ChatRepository`]; credentials are resolved by a
//! [`SessionValidator`]. Both are implemented in the infrastructure layer.

use async_trait::async_trait;

use super::entities::{Channel, Identity, Message, NewMessage, Reaction, ReactionToggle};
use crate::shared::error::{AuthFailure, StoreError};

/// Persistence collaborator consumed by the gateway services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Whether `user_id` is a member of `server_id`.
    async fn is_server_member(&self, user_id: i64, server_id: i64) -> Result<bool, StoreError>;

    /// Channels of a server ordered by position ascending.
    async fn list_channels(&self, server_id: i64) -> Result<Vec<Channel>, StoreError>;

    /// Whether the channel exists and `user_id` belongs to its server.
    async fn has_channel_access(&self, user_id: i64, channel_id: i64) -> Result<bool, StoreError>;

    /// Most recent messages of a channel, newest first.
    async fn list_recent_messages(
        &self,
        channel_id: i64,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError>;

    /// Persist a message and return it hydrated with author and attachments.
    async fn create_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Bump the channel's last-activity timestamp.
    async fn touch_channel_activity(&self, channel_id: i64) -> Result<(), StoreError>;

    /// Channel a message belongs to, if the message exists.
    async fn find_message_channel(&self, message_id: i64) -> Result<Option<i64>, StoreError>;

    /// Delete the `(user, message, emoji)` reaction if present, otherwise create it.
    async fn toggle_reaction(
        &self,
        user_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<ReactionToggle, StoreError>;

    /// Every reaction currently on a message, oldest first.
    async fn list_reactions(&self, message_id: i64) -> Result<Vec<Reaction>, StoreError>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Session collaborator: turns an opaque credential into an identity.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Resolve a non-empty credential.
    ///
    /// Returns `InvalidSession` for bad or expired credentials,
    /// `UserNotFound` when the identity no longer exists and `Unavailable`
    /// when the backing store cannot be reached.
    async fn validate(&self, credential: &str) -> Result<Identity, AuthFailure>;
}
