//! # Chat Gateway Library
//!
//! This crate provides the real-time messaging gateway of a community
//! chat platform:
//! - WebSocket connections authenticated at upgrade time
//! - Per-channel rooms with ordered history-then-live delivery
//! - Typing indicators with server-side expiry
//! - Reaction toggles with aggregate broadcasts
//! - PostgreSQL for membership, history and reactions
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities and collaborator traits
//! - **Application Layer**: Gateway services, presence registry and event DTOs
//! - **Infrastructure Layer**: PostgreSQL, JWT validation and metrics
//! - **Presentation Layer**: HTTP routes and WebSocket handlers
//!
//! ## Module Structure
//!
//! ```text
//! chat_gateway/
//! +-- config/         Configuration management
//! +-- domain/         Entities and collaborator traits
//! +-- application/    Gateway services and DTOs
//! +-- infrastructure/ Database, session validation and metrics
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, snowflake IDs, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Entities and collaborator contracts
pub mod domain;

// Application layer - Gateway services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
