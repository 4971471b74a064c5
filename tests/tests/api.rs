//! Tests for the address submission endpoint.
//!
//! POST /addresses → MockPublisher (captures addresses per topic role)

use axum::http::StatusCode;
use integration_tests::{fixtures, mocks::MockPublisher, setup::api_server};
use redpanda::TopicRole;
use serde_json::json;

#[tokio::test]
async fn test_submit_defaults_to_primary() {
    let publisher = MockPublisher::new();
    let server = api_server(publisher.clone());

    let addresses: Vec<String> = fixtures::addresses(3).iter().map(|a| a.to_string()).collect();
    let response = server
        .post("/addresses")
        .json(&json!({ "addresses": addresses }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["accepted"], 3);
    assert_eq!(body["rejected"], 0);
    assert!(body.get("errors").is_none());

    let published = publisher.published();
    assert_eq!(published.len(), 3);
    assert!(published.iter().all(|(role, _)| *role == TopicRole::Primary));
}

#[tokio::test]
async fn test_submit_high_priority_normalizes_and_rejects() {
    let publisher = MockPublisher::new();
    let server = api_server(publisher.clone());

    let response = server
        .post("/addresses")
        .json(&json!({
            "addresses": [
                "0x52908400098527886E0F7030069857D2E4169EE7",
                "vitalik.eth",
                "0x1234"
            ],
            "topic": "high_priority"
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["accepted"], 1);
    assert_eq!(body["rejected"], 2);
    assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));

    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, TopicRole::HighPriority);
    assert_eq!(
        published[0].1.as_str(),
        "0x52908400098527886e0f7030069857d2e4169ee7"
    );
}

#[tokio::test]
async fn test_submit_names_topic() {
    let publisher = MockPublisher::new();
    let server = api_server(publisher.clone());

    server
        .post("/addresses")
        .json(&json!({ "addresses": [fixtures::address(1).to_string()], "topic": "names" }))
        .await
        .assert_status_ok();

    assert_eq!(publisher.published()[0].0, TopicRole::Names);
}

#[tokio::test]
async fn test_submit_unknown_topic_rejected() {
    let publisher = MockPublisher::new();
    let server = api_server(publisher.clone());

    let response = server
        .post("/addresses")
        .json(&json!({ "addresses": [], "topic": "urgent" }))
        .expect_failure()
        .await;

    assert!(response.status_code().is_client_error());
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn test_submit_publisher_failure() {
    let publisher = MockPublisher::new();
    publisher.set_should_fail(true);
    let server = api_server(publisher);

    let response = server
        .post("/addresses")
        .json(&json!({ "addresses": [fixtures::address(1).to_string()] }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "BROKER_002");
}
