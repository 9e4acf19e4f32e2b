//! # Domain Layer
//!
//! Entities the gateway works with and the contracts of its two external
//! collaborators: the persistence store and the session validator.
//!
//! ## Structure
//!
//! - **entities**: Identity, Channel, Message, Reaction
//! - **repository**: `ChatRepository` and `SessionValidator` traits,
//!   implemented in the infrastructure layer (and by test doubles)

pub mod entities;
pub mod repository;

// Re-export commonly used types
pub use entities::*;
pub use repository::{ChatRepository, SessionValidator};
