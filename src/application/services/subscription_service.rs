//! Subscription Service
//!
//! Server scope selection and channel room joins.

use std::sync::Arc;
use std::time::Duration;

use super::presence_registry::PresenceRegistry;
use super::typing_service::TypingCoordinator;
use super::bounded;
use crate::application::dto::events::{ChannelPayload, MessagePayload};
use crate::application::dto::ServerEvent;
use crate::application::session::ConnectionState;
use crate::domain::ChatRepository;
use crate::shared::error::GatewayError;

pub struct SubscriptionService {
    registry: Arc<PresenceRegistry>,
    repository: Arc<dyn ChatRepository>,
    typing: TypingCoordinator,
    history_limit: i64,
    timeout: Duration,
}

impl SubscriptionService {
    pub fn new(
        registry: Arc<PresenceRegistry>,
        repository: Arc<dyn ChatRepository>,
        typing: TypingCoordinator,
        history_limit: i64,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            repository,
            typing,
            history_limit,
            timeout,
        }
    }

    /// Set the connection's server scope and reply with the channel list.
    ///
    /// Room membership is untouched. On any failure the previous scope is kept.
    #[tracing::instrument(skip(self, connection), fields(connection_id = %connection.id))]
    pub async fn join_server(
        &self,
        connection: &mut ConnectionState,
        server_id: i64,
    ) -> Result<(), GatewayError> {
        let user_id = connection.user_id();

        let is_member = bounded(
            "is_server_member",
            self.timeout,
            self.repository.is_server_member(user_id, server_id),
        )
        .await?;
        if !is_member {
            return Err(GatewayError::NotServerMember(server_id));
        }

        let mut channels = bounded(
            "list_channels",
            self.timeout,
            self.repository.list_channels(server_id),
        )
        .await?;
        channels.sort_by_key(|channel| (channel.position, channel.id));

        connection.current_server_scope = Some(server_id);
        self.registry.send_to(
            connection.id,
            ServerEvent::ServerChannels(channels.iter().map(ChannelPayload::from).collect()),
        );

        tracing::debug!(user_id, channels = channels.len(), "Server scope set");
        Ok(())
    }

    /// Move the connection into a channel room.
    ///
    /// Runs under the room's commit lock: the history snapshot, the room
    /// switch and the `user-joined` announcement are ordered against every
    /// message committed to the room. A failed history fetch leaves the
    /// connection where it was.
    #[tracing::instrument(skip(self, connection), fields(connection_id = %connection.id))]
    pub async fn join_channel(
        &self,
        connection: &mut ConnectionState,
        channel_id: i64,
    ) -> Result<(), GatewayError> {
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

        let _commit = self.registry.lock_room(channel_id).await;

        let mut history = bounded(
            "list_recent_messages",
            self.timeout,
            self.repository
                .list_recent_messages(channel_id, self.history_limit),
        )
        .await?;
        history.reverse();

        let Some(previous) = self.registry.move_to_room(connection.id, channel_id) else {
            tracing::debug!(user_id, "Connection closed before joining channel");
            return Ok(());
        };
        connection.current_room = Some(channel_id);

        if let Some(previous) = previous {
            self.typing.clear(previous, user_id, connection.id);
        }

        self.registry.send_to(
            connection.id,
            ServerEvent::ChannelMessages(history.iter().map(MessagePayload::from).collect()),
        );
        self.registry.broadcast_to_room_except(
            channel_id,
            connection.id,
            ServerEvent::user_joined(&connection.identity),
        );

        tracing::debug!(user_id, ?previous, history = history.len(), "Joined channel");
        Ok(())
    }
}
