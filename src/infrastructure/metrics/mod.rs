//! Prometheus Metrics Module
//!
//! Provides gateway-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connections and live rooms
//! - Inbound events by name, outbound events by name
//! - Per-event failures by error code
//! - Collaborator call latency histograms

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "chat_gateway";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new(
            "websocket_connections_active",
            "Number of registered gateway connections",
        )
        .namespace(NAMESPACE),
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Rooms with at least one member
pub static ROOMS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("rooms_active", "Number of channel rooms with members").namespace(NAMESPACE),
    )
    .expect("Failed to create ROOMS_ACTIVE metric")
});

/// Inbound events by wire name
pub static EVENTS_RECEIVED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gateway_events_received_total", "Inbound gateway events").namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create EVENTS_RECEIVED_TOTAL metric")
});

/// Outbound deliveries by wire name (one per recipient)
pub static EVENTS_DISPATCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "gateway_events_dispatched_total",
            "Outbound gateway events queued for delivery",
        )
        .namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create EVENTS_DISPATCHED_TOTAL metric")
});

/// Failed inbound events by error code
pub static ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gateway_errors_total", "Inbound events that ended in an error")
            .namespace(NAMESPACE),
        &["code"],
    )
    .expect("Failed to create ERRORS_TOTAL metric")
});

/// Collaborator call duration histogram
pub static COLLABORATOR_CALL_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
    HistogramVec::new(
        HistogramOpts::new(
            "collaborator_call_duration_seconds",
            "Persistence and session collaborator latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["operation"],
    )
    .expect("Failed to create COLLABORATOR_CALL_DURATION_SECONDS metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(ROOMS_ACTIVE.clone()))
        .expect("Failed to register ROOMS_ACTIVE");
    registry
        .register(Box::new(EVENTS_RECEIVED_TOTAL.clone()))
        .expect("Failed to register EVENTS_RECEIVED_TOTAL");
    registry
        .register(Box::new(EVENTS_DISPATCHED_TOTAL.clone()))
        .expect("Failed to register EVENTS_DISPATCHED_TOTAL");
    registry
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("Failed to register ERRORS_TOTAL");
    registry
        .register(Box::new(COLLABORATOR_CALL_DURATION_SECONDS.clone()))
        .expect("Failed to register COLLABORATOR_CALL_DURATION_SECONDS");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_event_received(event: &str) {
    EVENTS_RECEIVED_TOTAL.with_label_values(&[event]).inc();
}

pub fn record_events_dispatched(event: &str, recipients: usize) {
    if recipients > 0 {
        EVENTS_DISPATCHED_TOTAL
            .with_label_values(&[event])
            .inc_by(recipients as u64);
    }
}

pub fn record_gateway_error(code: &str) {
    ERRORS_TOTAL.with_label_values(&[code]).inc();
}

/// Helper to record collaborator latency
pub fn record_collaborator_call(operation: &str, duration_secs: f64) {
    COLLABORATOR_CALL_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Helper to update the presence gauges
pub fn set_presence(connections: usize, rooms: usize) {
    WEBSOCKET_CONNECTIONS_ACTIVE.set(connections as i64);
    ROOMS_ACTIVE.set(rooms as i64);
}
