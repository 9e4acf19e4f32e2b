//! Application Layer
//!
//! Gateway services and the event DTOs they exchange with the transport.
//! Services operate on a [`session::ConnectionState`] owned by the
//! connection's session task and fan events out through the shared
//! presence registry.

pub mod dto;
pub mod services;
pub mod session;
