//! Per-connection gateway state.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::Identity;

/// Identifier of one live socket. A user may hold several.
pub type ConnectionId = Uuid;

/// State owned by a connection's session task.
///
/// Only the session task mutates it, so handlers receive `&mut` access
/// and never lock. The presence registry keeps its own copy of the
/// current room for fan-out.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub id: ConnectionId,
    pub identity: Arc<Identity>,
    /// Channel whose room this connection is subscribed to
    pub current_room: Option<i64>,
    /// Last server whose channel list was requested
    pub current_server_scope: Option<i64>,
}

impl ConnectionState {
    pub fn new(id: ConnectionId, identity: Arc<Identity>) -> Self {
        Self {
            id,
            identity,
            current_room: None,
            current_server_scope: None,
        }
    }

    pub fn user_id(&self) -> i64 {
        self.identity.id
    }
}
