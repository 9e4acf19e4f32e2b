//! # Domain Entities
//!
//! The records the gateway reads from and hands to its collaborators.
//!
//! - **Identity**: authenticated principal and message author profile
//! - **Channel**: a topic within a server; the key of a live room
//! - **Message** / **Attachment**: persisted chat history
//! - **Reaction**: one user's emoji on one message

mod channel;
mod identity;
mod message;
mod reaction;

pub use channel::{Channel, ChannelType};
pub use identity::{Identity, DEFAULT_ANONYMOUS_ALIAS};
pub use message::{Attachment, Message, MessageType, NewMessage};
pub use reaction::{Reaction, ReactionToggle};
