//! Presence Service
//!
//! Admits authenticated connections into the registry and tears them down.

use std::sync::Arc;

use uuid::Uuid;

use super::presence_registry::{Outbound, PresenceRegistry};
use super::typing_service::TypingCoordinator;
use crate::application::dto::events::{AuthorPayload, ReadyPayload};
use crate::application::dto::ServerEvent;
use crate::application::session::{ConnectionId, ConnectionState};
use crate::domain::Identity;

pub struct PresenceService {
    registry: Arc<PresenceRegistry>,
    typing: TypingCoordinator,
}

impl PresenceService {
    pub fn new(registry: Arc<PresenceRegistry>, typing: TypingCoordinator) -> Self {
        Self { registry, typing }
    }

    /// Register a connection and greet it with `ready`.
    pub fn connect(&self, identity: Identity, outbound: Outbound) -> ConnectionState {
        let connection_id = Uuid::new_v4();
        let identity = Arc::new(identity);

        self.registry
            .register(connection_id, Arc::clone(&identity), outbound);
        self.registry.send_to(
            connection_id,
            ServerEvent::Ready(ReadyPayload {
                connection_id,
                user: AuthorPayload::from(identity.as_ref()),
            }),
        );

        tracing::info!(
            connection_id = %connection_id,
            user_id = identity.id,
            connections = self.registry.connection_count(),
            "Connection admitted"
        );
        ConnectionState::new(connection_id, identity)
    }

    /// Remove a connection, clear its typing indicator and announce the
    /// departure to its last room.
    ///
    /// Returns `false` if the connection was already gone; in that case
    /// nothing is broadcast.
    pub fn disconnect(&self, connection_id: ConnectionId) -> bool {
        let Some(departure) = self.registry.unregister(connection_id) else {
            return false;
        };
        let user_id = departure.identity.id;

        if let Some(room) = departure.room {
            self.typing.clear(room, user_id, connection_id);
            self.registry
                .broadcast_to_room(room, ServerEvent::user_left(user_id));
        }

        tracing::info!(
            connection_id = %connection_id,
            user_id,
            room = ?departure.room,
            connections = self.registry.connection_count(),
            "Connection closed"
        );
        true
    }
}
