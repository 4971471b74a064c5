//! Health check endpoints.

use axum::{http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::HealthResponse;

/// GET /health - Full health check.
pub async fn health_handler() -> Json<HealthResponse> {
    let report = health().report();

    Json(HealthResponse {
        status: format!("{:?}", report.status).to_lowercase(),
        redpanda_connected: health().redpanda.is_healthy(),
        clickhouse_connected: health().clickhouse.is_healthy(),
        consuming_groups: report.consuming_groups,
        high_priority_lag: metrics().high_priority_lag.get(),
        low_priority_paused: metrics().low_priority_paused.get() > 0,
    })
}

/// GET /health/ready - Readiness probe (can accept addresses).
pub async fn ready_handler() -> StatusCode {
    if health().is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
