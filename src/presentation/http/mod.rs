//! HTTP surface: the gateway upgrade route, health probes and metrics.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
