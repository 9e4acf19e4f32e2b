//! Message Service
//!
//! Persist-then-broadcast routing of chat messages into the sender's room.

use std::sync::Arc;
use std::time::Duration;

use validator::Validate;

use super::presence_registry::PresenceRegistry;
use super::typing_service::TypingCoordinator;
use super::bounded;
use crate::application::dto::events::MessagePayload;
use crate::application::dto::{SendMessageRequest, ServerEvent};
use crate::application::session::ConnectionState;
use crate::domain::{ChatRepository, Message, NewMessage};
use crate::shared::error::GatewayError;
use crate::shared::validation::validation_error;

pub struct MessageRouter {
    registry: Arc<PresenceRegistry>,
    repository: Arc<dyn ChatRepository>,
    typing: TypingCoordinator,
    timeout: Duration,
}

impl MessageRouter {
    pub fn new(
        registry: Arc<PresenceRegistry>,
        repository: Arc<dyn ChatRepository>,
        typing: TypingCoordinator,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            repository,
            typing,
            timeout,
        }
    }

    /// Persist a message in the connection's room and fan it out to every
    /// subscriber, sender included.
    ///
    /// Nothing is broadcast unless the store confirmed the write. Access
    /// is re-checked so a user removed from the server stops reaching
    /// the room even while still subscribed.
    #[tracing::instrument(skip(self, connection, request), fields(connection_id = %connection.id))]
    pub async fn send_message(
        &self,
        connection: &ConnectionState,
        request: SendMessageRequest,
    ) -> Result<Message, GatewayError> {
        let channel_id = connection.current_room.ok_or(GatewayError::NotInChannel)?;
        request.validate().map_err(validation_error)?;
        let message_type = request.resolved_type()?;
        let user_id = connection.user_id();

        let allowed = bounded(
            "has_channel_access",
            self.timeout,
            self.repository.has_channel_access(user_id, channel_id),
        )
        .await?;
        if !allowed {
            return Err(GatewayError::ChannelAccessDenied(channel_id));
        }

        let message = {
            let _commit = self.registry.lock_room(channel_id).await;
            let message = bounded(
                "create_message",
                self.timeout,
                self.repository.create_message(NewMessage {
                    author_id: user_id,
                    channel_id,
                    content: request.content,
                    message_type,
                }),
            )
            .await?;

            let delivered = self.registry.broadcast_to_room(
                channel_id,
                ServerEvent::NewMessage(MessagePayload::from(&message)),
            );
            tracing::debug!(message_id = message.id, delivered, "Message broadcast");
            message
        };

        self.typing.clear(channel_id, user_id, connection.id);

        // Already delivered; activity failures are logged only.
        if let Err(e) = bounded(
            "touch_channel_activity",
            self.timeout,
            self.repository.touch_channel_activity(channel_id),
        )
        .await
        {
            tracing::warn!(channel_id, error = %e, "Failed to touch channel activity");
        }

        Ok(message)
    }
}
