//! Data Transfer Objects
//!
//! Inbound event payloads and the outbound event envelope.

pub mod events;
pub mod request;

pub use events::ServerEvent;
pub use request::{parse_id, AddReactionRequest, SendMessageRequest};
