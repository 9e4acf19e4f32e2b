//! WebSocket Session Liveness

use std::time::{Duration, Instant};

use crate::application::session::ConnectionId;

/// Transport-level bookkeeping for one socket.
#[derive(Debug)]
pub struct SessionState {
    pub connection_id: ConnectionId,
    pub frames_received: u64,
    pub last_seen: Instant,
}

impl SessionState {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            frames_received: 0,
            last_seen: Instant::now(),
        }
    }

    /// Record inbound traffic of any kind, pongs included.
    pub fn heartbeat(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn record_frame(&mut self) {
        self.frames_received += 1;
        self.heartbeat();
    }

    pub fn is_alive(&self, idle_timeout: Duration) -> bool {
        self.last_seen.elapsed() < idle_timeout
    }
}
