//! Reaction Service
//!
//! Toggles one user's emoji on a message and republishes the full
//! reaction list.

use std::sync::Arc;
use std::time::Duration;

use validator::Validate;

use super::presence_registry::PresenceRegistry;
use super::bounded;
use crate::application::dto::events::{ReactionPayload, ReactionsPayload};
use crate::application::dto::{parse_id, AddReactionRequest, ServerEvent};
use crate::application::session::ConnectionState;
use crate::config::ReactionBroadcast;
use crate::domain::{ChatRepository, ReactionToggle};
use crate::shared::error::GatewayError;
use crate::shared::validation::validation_error;

pub struct ReactionAggregator {
    registry: Arc<PresenceRegistry>,
    repository: Arc<dyn ChatRepository>,
    scope: ReactionBroadcast,
    timeout: Duration,
}

impl ReactionAggregator {
    pub fn new(
        registry: Arc<PresenceRegistry>,
        repository: Arc<dyn ChatRepository>,
        scope: ReactionBroadcast,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            repository,
            scope,
            timeout,
        }
    }

    /// Toggle `(user, message, emoji)` and broadcast the resulting set.
    ///
    /// The caller must have access to the message's channel but need not be
    /// subscribed to it. Toggle, re-read and broadcast run under the
    /// channel's commit lock so concurrent toggles publish in commit order.
    #[tracing::instrument(skip(self, connection, request), fields(connection_id = %connection.id))]
    pub async fn toggle_reaction(
        &self,
        connection: &ConnectionState,
        request: AddReactionRequest,
    ) -> Result<ReactionToggle, GatewayError> {
        request.validate().map_err(validation_error)?;
        let message_id = parse_id("messageId", &request.message_id)?;
        let user_id = connection.user_id();

        let channel_id = bounded(
            "find_message_channel",
            self.timeout,
            self.repository.find_message_channel(message_id),
        )
        .await?
        .ok_or(GatewayError::MessageNotFound(message_id))?;

        let allowed = bounded(
            "has_channel_access",
            self.timeout,
            self.repository.has_channel_access(user_id, channel_id),
        )
        .await?;
        if !allowed {
            return Err(GatewayError::ChannelAccessDenied(channel_id));
        }

        let _commit = self.registry.lock_room(channel_id).await;

        let outcome = bounded(
            "toggle_reaction",
            self.timeout,
            self.repository
                .toggle_reaction(user_id, message_id, &request.emoji),
        )
        .await?;

        let reactions = bounded(
            "list_reactions",
            self.timeout,
            self.repository.list_reactions(message_id),
        )
        .await?;

        let event = ServerEvent::MessageReactionsUpdated(ReactionsPayload {
            message_id: message_id.to_string(),
            reactions: reactions.iter().map(ReactionPayload::from).collect(),
        });

        let delivered = match self.scope {
            ReactionBroadcast::Platform => self.registry.broadcast_all(event),
            ReactionBroadcast::Room => {
                let mut delivered = self.registry.broadcast_to_room(channel_id, event.clone());
                if connection.current_room != Some(channel_id)
                    && self.registry.send_to(connection.id, event)
                {
                    delivered += 1;
                }
                delivered
            }
        };

        tracing::debug!(message_id, ?outcome, reactions = reactions.len(), delivered, "Reaction toggled");
        Ok(outcome)
    }
}
