//! Repository Implementations
//!
//! PostgreSQL implementation of the domain's [`ChatRepository`](crate::domain::ChatRepository).
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crate::infrastructure::repositories::PgChatRepository;
//! use crate::shared::snowflake::{SnowflakeGenerator, DEFAULT_EPOCH};
//!
//! let snowflake = Arc::new(SnowflakeGenerator::new(1, DEFAULT_EPOCH));
//! let repository = PgChatRepository::new(pool.clone(), snowflake);
//! ```

pub mod chat_repository;

pub use chat_repository::PgChatRepository;
