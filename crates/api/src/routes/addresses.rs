//! Address submission endpoint.
//!
//! Body: `{ "addresses": ["0x..", ...], "topic": "primary" | "high_priority" | "names" }`.
//! Malformed addresses are rejected one by one; the rest are published.

use axum::{extract::State, Json};
use engine_core::Address;
use redpanda::TopicRole;
use serde::Deserialize;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::response::{ApiError, SubmitResponse};
use crate::state::AppState;

/// Largest accepted submission.
pub const MAX_SUBMIT_ADDRESSES: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub addresses: Vec<String>,
    #[serde(default = "default_topic")]
    pub topic: TopicRole,
}

fn default_topic() -> TopicRole {
    TopicRole::Primary
}

/// POST /addresses - Publish addresses for enrichment.
pub async fn submit_handler(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let start = Instant::now();

    if request.addresses.len() > MAX_SUBMIT_ADDRESSES {
        return Err(ApiError::bad_request(format!(
            "Submission has {} addresses, exceeds {} limit",
            request.addresses.len(),
            MAX_SUBMIT_ADDRESSES
        )));
    }

    let mut accepted = Vec::with_capacity(request.addresses.len());
    let mut errors = Vec::new();
    for raw in &request.addresses {
        match Address::parse(raw) {
            Some(address) => accepted.push(address),
            None => errors.push(format!("Invalid address: {}", raw)),
        }
    }

    if !errors.is_empty() {
        warn!(topic = %request.topic, rejected = errors.len(), "Rejected malformed addresses");
    }

    let result = state
        .publisher
        .publish(request.topic, &accepted)
        .await
        .map_err(|e| {
            error!(topic = %request.topic, "Failed to publish addresses: {}", e);
            ApiError::from(e)
        })?;

    errors.extend(result.errors);

    info!(
        topic = %request.topic,
        published = result.published,
        rejected = request.addresses.len() - accepted.len(),
        latency_ms = %start.elapsed().as_millis(),
        "Addresses submitted"
    );

    Ok(Json(SubmitResponse::new(
        result.published,
        request.addresses.len() - accepted.len(),
        errors,
    )))
}
