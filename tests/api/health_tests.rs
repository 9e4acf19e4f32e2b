//! Health Check API Tests

use axum::http::StatusCode;

use crate::common::{body_json, get, TestGateway};

#[tokio::test]
async fn test_health_check_returns_ok() {
    let gateway = TestGateway::new();
    let response = get(&gateway.router(), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let gateway = TestGateway::new();
    let response = get(&gateway.router(), "/health/live").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_gateway_counters() {
    let gateway = TestGateway::new();
    let router = gateway.router();

    let response = get(&router, "/health/ready").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["checks"]["database"]["status"], "healthy");
    assert_eq!(json["checks"]["gateway"]["active_connections"], 0);
    assert_eq!(json["checks"]["gateway"]["active_rooms"], 0);
}

#[tokio::test]
async fn test_readiness_fails_when_store_is_down() {
    let gateway = TestGateway::new();
    gateway.repository.fail_writes(true);

    let response = get(&gateway.router(), "/health/ready").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["checks"]["database"]["message"], "database unreachable");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_gateway_namespace() {
    let gateway = TestGateway::new();
    let response = get(&gateway.router(), "/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("chat_gateway_websocket_connections_active"));
}
