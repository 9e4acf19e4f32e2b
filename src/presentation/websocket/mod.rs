//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod session;

pub use connection::{ConnectionHandle, InboundFrame};
pub use handler::ws_handler;
pub use messages::{parse_client_event, ClientEvent};
pub use session::SessionState;
