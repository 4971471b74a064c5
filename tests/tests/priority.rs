//! Priority admission between the regular and high-priority topics.
//!
//! The consumer is a scripted in-memory group, so pause/resume and
//! delivery order are observable without a broker.

use engine_core::Source;
use integration_tests::{
    fixtures,
    mocks::{MockConsumer, MockSource},
    setup::Harness,
};
use redpanda::GroupConsumer;
use std::sync::Arc;
use worker::{PriorityConsumer, PriorityState};

const PRIMARY: &str = "wallets";
const HIGH: &str = "wallets_high_priority";

fn group(harness: &Harness, consumer: Arc<MockConsumer>, high: Option<&str>) -> PriorityConsumer {
    PriorityConsumer::new(
        consumer,
        harness.fact_processor(Arc::new(MockSource::new(Source::Opensea))),
        PRIMARY,
        high.map(str::to_string),
    )
}

async fn subscribed_consumer() -> Arc<MockConsumer> {
    let consumer = Arc::new(MockConsumer::new("opensea"));
    consumer
        .subscribe(&[PRIMARY.to_string(), HIGH.to_string()])
        .await
        .unwrap();
    consumer
}

#[tokio::test]
async fn test_backlog_pauses_primary() {
    let harness = Harness::new();
    let consumer = subscribed_consumer().await;
    let group = group(&harness, consumer.clone(), Some(HIGH));

    consumer.push(fixtures::delivery(HIGH, 0, &fixtures::addresses(3)));

    let state = group.reconcile_schedule().await;
    assert_eq!(state, PriorityState { low_priority_paused: true });
    assert!(consumer.is_paused(PRIMARY));
    assert!(!consumer.is_paused(HIGH));

    // Unchanged while the backlog remains.
    assert!(group.reconcile_schedule().await.low_priority_paused);
}

#[tokio::test]
async fn test_drained_backlog_resumes_primary() {
    let harness = Harness::new();
    let consumer = subscribed_consumer().await;
    let group = group(&harness, consumer.clone(), Some(HIGH));

    consumer.push(fixtures::delivery(HIGH, 0, &fixtures::addresses(3)));
    group.reconcile_schedule().await;
    assert!(consumer.is_paused(PRIMARY));

    let delivery = consumer.next_batch().await.unwrap().expect("high-priority batch");
    assert_eq!(delivery.topic, HIGH);
    group.process(&delivery).await.unwrap();

    assert!(!consumer.is_paused(PRIMARY), "resumed once the backlog is gone");
    assert_eq!(consumer.commits(), vec![(HIGH.to_string(), 3)]);
}

#[tokio::test]
async fn test_no_high_priority_topic_never_pauses() {
    let harness = Harness::new();
    let consumer = Arc::new(MockConsumer::new("ens-resolver"));
    consumer.subscribe(&["wallets_ens".to_string()]).await.unwrap();
    let group = PriorityConsumer::new(
        consumer.clone(),
        harness.fact_processor(Arc::new(MockSource::new(Source::Ens))),
        "wallets_ens",
        None,
    );

    consumer.push(fixtures::delivery("wallets_ens", 0, &fixtures::addresses(5)));
    let state = group.reconcile_schedule().await;

    assert_eq!(state, PriorityState::default());
    assert!(!consumer.is_paused("wallets_ens"));
}

/// A backlog present at startup is served before any primary batch.
#[tokio::test]
async fn test_run_serves_backlog_before_first_fetch() {
    let harness = Harness::new();
    let consumer = Arc::new(MockConsumer::new("opensea"));
    let group = group(&harness, consumer.clone(), Some(HIGH));

    consumer.push(fixtures::delivery(PRIMARY, 0, &fixtures::addresses(2)));
    consumer.push(fixtures::delivery(PRIMARY, 2, &fixtures::addresses(2)));
    consumer.push(fixtures::delivery(PRIMARY, 4, &fixtures::addresses(2)));
    consumer.push(fixtures::delivery(HIGH, 0, &fixtures::addresses(1)));
    consumer.set_fail_when_drained(true);

    let result = group.run().await;
    assert!(result.is_err(), "run ends when the broker fails");

    assert_eq!(consumer.subscribed(), vec![PRIMARY.to_string(), HIGH.to_string()]);
    assert_eq!(
        consumer.delivered_topics(),
        vec![HIGH, PRIMARY, PRIMARY, PRIMARY]
    );
    assert_eq!(consumer.commits().len(), 4);
    assert!(!consumer.is_paused(PRIMARY));
}
