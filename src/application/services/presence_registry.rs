//! Presence registry
//!
//! Process-wide map of live connections and channel rooms. Connections and
//! room membership share one lock, so a room switch is observed either
//! entirely before or entirely after any concurrent fan-out.
//!
//! Each room also owns a commit lock. Holding it serializes "persist then
//! broadcast" sequences against history snapshots taken on join.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};

use crate::application::dto::ServerEvent;
use crate::application::session::ConnectionId;
use crate::domain::Identity;
use crate::infrastructure::metrics;

/// Outbound queue of one connection.
pub type Outbound = mpsc::UnboundedSender<ServerEvent>;

struct ConnectionEntry {
    identity: Arc<Identity>,
    sender: Outbound,
    room: Option<i64>,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: HashMap<i64, HashSet<ConnectionId>>,
}

impl RegistryState {
    fn leave_room(&mut self, connection_id: ConnectionId, room: i64) -> bool {
        let Some(members) = self.rooms.get_mut(&room) else {
            return false;
        };
        members.remove(&connection_id);
        if members.is_empty() {
            self.rooms.remove(&room);
            return true;
        }
        false
    }

    fn publish_gauges(&self) {
        metrics::set_presence(self.connections.len(), self.rooms.len());
    }
}

/// What remains of a connection after it is unregistered.
#[derive(Debug, Clone)]
pub struct Departure {
    pub identity: Arc<Identity>,
    pub room: Option<i64>,
}

/// Connection and room bookkeeping shared by every gateway service.
#[derive(Default)]
pub struct PresenceRegistry {
    state: RwLock<RegistryState>,
    commit_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, connection_id: ConnectionId, identity: Arc<Identity>, sender: Outbound) {
        let mut state = self.state.write();
        state.connections.insert(
            connection_id,
            ConnectionEntry {
                identity,
                sender,
                room: None,
            },
        );
        state.publish_gauges();
    }

    /// Remove a connection and its room membership.
    ///
    /// Returns `None` when the connection was already gone, which makes
    /// disconnect handling idempotent.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<Departure> {
        let emptied;
        let departure = {
            let mut state = self.state.write();
            let entry = state.connections.remove(&connection_id)?;
            emptied = entry
                .room
                .filter(|room| state.leave_room(connection_id, *room));
            state.publish_gauges();
            Departure {
                identity: entry.identity,
                room: entry.room,
            }
        };
        if let Some(room) = emptied {
            self.release_commit_lock(room);
        }
        Some(departure)
    }

    /// Atomically leave the current room (if any) and join `room`.
    ///
    /// Returns the previous room, or `None` as the outer value when the
    /// connection is no longer registered.
    pub fn move_to_room(&self, connection_id: ConnectionId, room: i64) -> Option<Option<i64>> {
        let (previous, emptied) = {
            let mut state = self.state.write();
            let entry = state.connections.get_mut(&connection_id)?;
            let previous = entry.room.replace(room);
            let emptied = previous
                .filter(|prev| *prev != room)
                .filter(|prev| state.leave_room(connection_id, *prev));
            state.rooms.entry(room).or_default().insert(connection_id);
            state.publish_gauges();
            (previous, emptied)
        };
        if let Some(prev) = emptied {
            self.release_commit_lock(prev);
        }
        Some(previous)
    }

    pub fn is_registered(&self, connection_id: ConnectionId) -> bool {
        self.state.read().connections.contains_key(&connection_id)
    }

    pub fn current_room(&self, connection_id: ConnectionId) -> Option<i64> {
        self.state
            .read()
            .connections
            .get(&connection_id)
            .and_then(|entry| entry.room)
    }

    pub fn room_members(&self, room: i64) -> Vec<ConnectionId> {
        self.state
            .read()
            .rooms
            .get(&room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.state.read().connections.len()
    }

    pub fn room_count(&self) -> usize {
        self.state.read().rooms.len()
    }

    /// Queue an event for one connection.
    pub fn send_to(&self, connection_id: ConnectionId, event: ServerEvent) -> bool {
        let state = self.state.read();
        let delivered = state
            .connections
            .get(&connection_id)
            .map(|entry| entry.sender.send(event.clone()).is_ok())
            .unwrap_or(false);
        metrics::record_events_dispatched(event.event_name(), delivered as usize);
        delivered
    }

    /// Queue an event for every member of `room`. Returns the recipient count.
    pub fn broadcast_to_room(&self, room: i64, event: ServerEvent) -> usize {
        Self::fan_out(&self.state.read(), room, None, event)
    }

    /// Like [`broadcast_to_room`](Self::broadcast_to_room) but skipping one connection.
    pub fn broadcast_to_room_except(
        &self,
        room: i64,
        except: ConnectionId,
        event: ServerEvent,
    ) -> usize {
        Self::fan_out(&self.state.read(), room, Some(except), event)
    }

    /// Broadcast on behalf of `sender` to the rest of `room`.
    ///
    /// Returns `None` without delivering anything once `sender` has been
    /// unregistered, so nothing it says can trail its `user-left`.
    pub fn broadcast_from(
        &self,
        room: i64,
        sender: ConnectionId,
        event: ServerEvent,
    ) -> Option<usize> {
        let state = self.state.read();
        if !state.connections.contains_key(&sender) {
            return None;
        }
        Some(Self::fan_out(&state, room, Some(sender), event))
    }

    /// Queue an event for every registered connection.
    pub fn broadcast_all(&self, event: ServerEvent) -> usize {
        let state = self.state.read();
        let delivered = state
            .connections
            .values()
            .filter(|entry| entry.sender.send(event.clone()).is_ok())
            .count();
        metrics::record_events_dispatched(event.event_name(), delivered);
        delivered
    }

    /// Acquire the commit lock of `room`.
    ///
    /// The lock entry is discarded when the guard drops and the room has no
    /// members, so rooms that are only touched in passing leave nothing behind.
    pub async fn lock_room(&self, room: i64) -> RoomCommit<'_> {
        let lock = self
            .commit_locks
            .entry(room)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        RoomCommit {
            registry: self,
            room,
            guard: Some(lock.lock_owned().await),
        }
    }

    pub fn commit_lock_count(&self) -> usize {
        self.commit_locks.len()
    }

    fn fan_out(
        state: &RegistryState,
        room: i64,
        except: Option<ConnectionId>,
        event: ServerEvent,
    ) -> usize {
        let Some(members) = state.rooms.get(&room) else {
            return 0;
        };

        let delivered = members
            .iter()
            .filter(|id| Some(**id) != except)
            .filter_map(|id| state.connections.get(id))
            .filter(|entry| entry.sender.send(event.clone()).is_ok())
            .count();

        metrics::record_events_dispatched(event.event_name(), delivered);
        tracing::trace!(room, event = event.event_name(), delivered, "Room broadcast");
        delivered
    }

    /// Drop the commit lock of an empty room unless someone still holds it.
    fn release_commit_lock(&self, room: i64) {
        self.commit_locks
            .remove_if(&room, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Held commit lock of one room.
pub struct RoomCommit<'a> {
    registry: &'a PresenceRegistry,
    room: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RoomCommit<'_> {
    fn drop(&mut self) {
        // unlock first so our own handle no longer counts as a holder
        self.guard.take();
        let occupied = self.registry.state.read().rooms.contains_key(&self.room);
        if !occupied {
            self.registry.release_commit_lock(self.room);
        }
    }
}
