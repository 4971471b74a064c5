//! Tests for health check endpoints.

use axum::http::StatusCode;
use integration_tests::{mocks::MockPublisher, setup::api_server};

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let server = api_server(MockPublisher::new());

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    for field in [
        "status",
        "redpanda_connected",
        "clickhouse_connected",
        "consuming_groups",
        "high_priority_lag",
        "low_priority_paused",
    ] {
        assert!(body.get(field).is_some(), "Response should have '{}' field", field);
    }
    assert!(body["high_priority_lag"].as_u64().is_some());
}

/// Test /health endpoint reports a known status
#[tokio::test]
async fn test_health_endpoint_status() {
    let server = api_server(MockPublisher::new());

    let body: serde_json::Value = server.get("/health").await.json();

    // Components may not have reported yet in a test process
    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "Status should be 'healthy', 'degraded', or 'unhealthy', got '{}'",
        status
    );
}

/// Test /health/ready endpoint
#[tokio::test]
async fn test_ready_endpoint() {
    let server = api_server(MockPublisher::new());

    let status = server.get("/health/ready").await.status_code();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "Ready endpoint should return 200 or 503, got {}",
        status
    );
}

/// Test /health/live endpoint returns 200 while the service runs
#[tokio::test]
async fn test_live_endpoint() {
    let server = api_server(MockPublisher::new());

    server.get("/health/live").await.assert_status_ok();
}
