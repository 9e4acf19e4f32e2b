//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - PostgreSQL pool and migrations
//! - The PostgreSQL-backed chat repository
//! - JWT session validation
//! - Prometheus metrics

pub mod auth;
pub mod database;
pub mod metrics;
pub mod repositories;
