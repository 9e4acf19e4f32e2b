//! Typing indicators
//!
//! Tracks who is typing in which room. Every `typing-start` writes a new
//! generation for the `(room, user)` key and schedules an expiry; the
//! expiry only fires if no newer start, stop or cleanup touched the key
//! in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use super::presence_registry::PresenceRegistry;
use crate::application::dto::ServerEvent;
use crate::application::session::{ConnectionId, ConnectionState};

#[derive(Debug, Clone, Copy)]
struct TypingEntry {
    generation: u64,
    connection_id: ConnectionId,
}

/// Typing state shared by every connection.
#[derive(Clone)]
pub struct TypingCoordinator {
    registry: Arc<PresenceRegistry>,
    entries: Arc<DashMap<(i64, i64), TypingEntry>>,
    generations: Arc<AtomicU64>,
    ttl: Duration,
}

impl TypingCoordinator {
    pub fn new(registry: Arc<PresenceRegistry>, ttl: Duration) -> Self {
        Self {
            registry,
            entries: Arc::new(DashMap::new()),
            generations: Arc::new(AtomicU64::new(0)),
            ttl,
        }
    }

    /// Mark the connection's user as typing in its current room.
    ///
    /// No-op without a current room or once the connection is unregistered.
    /// Repeated starts refresh the expiry.
    pub fn start(&self, connection: &ConnectionState) -> bool {
        let Some(room) = connection.current_room else {
            return false;
        };
        if !self.registry.is_registered(connection.id) {
            return false;
        }
        let user_id = connection.user_id();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let key = (room, user_id);

        self.entries.insert(
            key,
            TypingEntry {
                generation,
                connection_id: connection.id,
            },
        );
        let announced = self.registry.broadcast_from(
            room,
            connection.id,
            ServerEvent::user_typing(&connection.identity),
        );
        if announced.is_none() {
            // disconnect won the race; its cleanup may already have run
            self.entries
                .remove_if(&key, |_, entry| entry.generation == generation);
            return false;
        }
        self.schedule_expiry(room, user_id, generation);
        true
    }

    /// Explicit stop. Always broadcast, even if the indicator already expired.
    pub fn stop(&self, connection: &ConnectionState) -> bool {
        let Some(room) = connection.current_room else {
            return false;
        };
        let user_id = connection.user_id();
        self.entries.remove(&(room, user_id));
        self.registry
            .broadcast_from(room, connection.id, ServerEvent::user_stop_typing(user_id))
            .is_some()
    }

    /// Clear the indicator `connection_id` set in `room`, broadcasting a stop
    /// only when one was active.
    ///
    /// Used when the user sends a message, changes room or disconnects.
    pub fn clear(&self, room: i64, user_id: i64, connection_id: ConnectionId) -> bool {
        let removed = self
            .entries
            .remove_if(&(room, user_id), |_, entry| entry.connection_id == connection_id)
            .is_some();
        if removed {
            self.registry.broadcast_to_room_except(
                room,
                connection_id,
                ServerEvent::user_stop_typing(user_id),
            );
        }
        removed
    }

    pub fn is_typing(&self, room: i64, user_id: i64) -> bool {
        self.entries.contains_key(&(room, user_id))
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    fn schedule_expiry(&self, room: i64, user_id: i64, generation: u64) {
        let entries = Arc::clone(&self.entries);
        let registry = Arc::clone(&self.registry);
        let ttl = self.ttl;

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let expired =
                entries.remove_if(&(room, user_id), |_, entry| entry.generation == generation);
            if let Some((_, entry)) = expired {
                tracing::debug!(room, user_id, "Typing indicator expired");
                registry.broadcast_to_room_except(
                    room,
                    entry.connection_id,
                    ServerEvent::user_stop_typing(user_id),
                );
            }
        });
    }
}
