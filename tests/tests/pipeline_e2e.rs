//! End-to-end tests for the enrichment pipeline.
//!
//! Payloads go through the real batch processor, cache gate and fact sink,
//! with the lookup service and the stores replaced by in-memory mocks:
//! delivery → normalize → window → cache gate → source → facts + cache → ping

use engine_core::Source;
use integration_tests::{
    fixtures,
    mocks::{MemoryStore, MockConsumer, MockSource, RecordingHeartbeat},
    setup::Harness,
};
use redpanda::GroupConsumer;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use worker::PriorityConsumer;

fn social_source(enriched: &[u64]) -> Arc<MockSource> {
    let source = MockSource::new(Source::Opensea);
    for n in enriched {
        let address = fixtures::address(*n);
        source.insert(fixtures::social_fact(&address, &format!("user{}", n)));
    }
    Arc::new(source)
}

async fn handle(
    harness: &Harness,
    source: Arc<MockSource>,
    addresses: &[engine_core::Address],
    heartbeat: &RecordingHeartbeat,
) -> worker::BatchReport {
    let payloads = fixtures::payloads(addresses);
    harness
        .fact_processor(source)
        .handle(payloads.iter().map(|p| Some(p.as_slice())), heartbeat)
        .await
        .expect("batch should complete")
}

/// One window of 50 with 10 known profiles: 10 facts, 50 cache rows, one ping.
#[tokio::test]
async fn test_single_window_e2e() {
    let harness = Harness::new();
    let source = social_source(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    let heartbeat = RecordingHeartbeat::default();

    let report = handle(&harness, source.clone(), &fixtures::addresses(50), &heartbeat).await;

    assert_eq!(report.received, 50);
    assert_eq!(report.windows, 1);
    assert_eq!(report.resolved, 50);
    assert_eq!(report.enriched, 10);
    assert_eq!(harness.store.fact_count(), 10);
    assert_eq!(harness.store.cache_len(), 50);
    assert_eq!(heartbeat.pings(), 1);
    assert_eq!(source.calls().len(), 1);

    let entry = harness
        .store
        .cache_entry(&fixtures::address(50), Source::Opensea)
        .expect("empty results are cached too");
    assert_eq!(entry.next_lookup_at, fixtures::t0() + chrono::Duration::days(14));
}

/// Batches are split into windows of 50 with a ping after each.
#[tokio::test]
async fn test_windows_of_fifty() {
    let harness = Harness::new();
    let source = social_source(&[]);
    let heartbeat = RecordingHeartbeat::default();

    let report = handle(&harness, source.clone(), &fixtures::addresses(120), &heartbeat).await;

    assert_eq!(report.windows, 3);
    assert_eq!(heartbeat.pings(), 3);
    let sizes: Vec<usize> = source.calls().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![50, 50, 20]);
    assert_eq!(harness.store.cache_len(), 120);
}

/// Malformed payloads are dropped before windowing and counted.
#[tokio::test]
async fn test_malformed_payloads_dropped() {
    let harness = Harness::new();
    let source = social_source(&[1]);
    let heartbeat = RecordingHeartbeat::default();

    let valid = fixtures::address(1).to_string();
    let upper = valid.to_uppercase().replace("0X", "0x");
    let payloads: Vec<Option<&[u8]>> = vec![
        Some(valid.as_bytes()),
        Some(&b"not-an-address"[..]),
        None,
        Some(&b"0x1234"[..]),
        Some(upper.as_bytes()),
    ];

    let report = harness
        .fact_processor(source.clone())
        .handle(payloads, &heartbeat)
        .await
        .unwrap();

    assert_eq!(report.received, 5);
    assert_eq!(report.invalid, 3);
    // The upper-cased copy normalizes to the same address.
    assert_eq!(source.calls(), vec![vec![fixtures::address(1)]]);
    assert_eq!(harness.store.fact_count(), 1);
}

/// Addresses looked up at T are skipped until T + TTL, then due again.
#[tokio::test]
async fn test_cache_ttl_eligibility() {
    let harness = Harness::new();
    let source = social_source(&[]);
    let heartbeat = RecordingHeartbeat::default();
    let addresses = fixtures::addresses(50);

    let first = handle(&harness, source.clone(), &addresses, &heartbeat).await;
    assert_eq!(first.resolved, 50);

    harness
        .clock
        .advance(chrono::Duration::days(14) - chrono::Duration::seconds(1));
    let cached = handle(&harness, source.clone(), &addresses, &heartbeat).await;
    assert_eq!(cached.resolved, 0);
    assert_eq!(cached.windows, 1, "a fully cached window still pings");

    harness.clock.advance(chrono::Duration::seconds(1));
    let due = handle(&harness, source.clone(), &addresses, &heartbeat).await;
    assert_eq!(due.resolved, 50);
    assert_eq!(source.resolved_count(), 100);
}

/// Repeats within a window are looked up once.
#[tokio::test]
async fn test_duplicates_resolved_once() {
    let harness = Harness::new();
    let source = social_source(&[]);
    let heartbeat = RecordingHeartbeat::default();

    let distinct = fixtures::addresses(5);
    let repeated: Vec<_> = distinct.iter().cycle().take(50).cloned().collect();

    let report = handle(&harness, source.clone(), &repeated, &heartbeat).await;
    assert_eq!(report.resolved, 5);
    assert_eq!(harness.store.cache_len(), 5);
}

/// A failed write loses that window only; later windows still run.
#[tokio::test]
async fn test_persist_failure_continues() {
    let harness = Harness::new();
    let source = social_source(&[1, 60]);
    let heartbeat = RecordingHeartbeat::default();
    harness.store.set_fail_facts(true);

    let report = handle(&harness, source.clone(), &fixtures::addresses(100), &heartbeat).await;

    assert_eq!(report.windows, 2);
    assert_eq!(report.failed_windows, 2);
    assert_eq!(heartbeat.pings(), 2);
    assert_eq!(harness.store.fact_count(), 0);
    assert_eq!(harness.store.cache_len(), 0, "failed windows stay due");

    harness.store.set_fail_facts(false);
    let retry = handle(&harness, source, &fixtures::addresses(100), &heartbeat).await;
    assert_eq!(retry.failed_windows, 0);
    assert_eq!(harness.store.fact_count(), 2);
    assert_eq!(harness.store.cache_len(), 100);
}

/// When the cache cannot be read every address is looked up.
#[tokio::test]
async fn test_cache_read_failure_resolves_all() {
    let harness = Harness::new();
    let source = social_source(&[]);
    let heartbeat = RecordingHeartbeat::default();

    handle(&harness, source.clone(), &fixtures::addresses(10), &heartbeat).await;
    harness.store.set_fail_cache_reads(true);
    let report = handle(&harness, source.clone(), &fixtures::addresses(10), &heartbeat).await;

    assert_eq!(report.resolved, 10);
    assert_eq!(source.resolved_count(), 20);
}

/// Rate-limited sources pause after each full window only.
///
/// The runtime clock is paused, so sleeps advance virtual time exactly.
#[tokio::test(start_paused = true)]
async fn test_window_pause_between_windows() {
    let harness = Harness::new();
    let source = Arc::new(MockSource::new(Source::Opensea).with_window_pause(Duration::from_millis(250)));
    let heartbeat = RecordingHeartbeat::default();

    let start = Instant::now();
    let report = handle(&harness, source, &fixtures::addresses(120), &heartbeat).await;
    let elapsed = start.elapsed();

    assert_eq!(report.windows, 3);
    assert!(elapsed >= Duration::from_millis(500), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(750), "no pause after the partial window");
}

/// Through the consumer: one delivery, pings on the session, one commit.
#[tokio::test]
async fn test_consumer_commits_processed_batch() {
    let harness = Harness::new();
    let source = social_source(&[3]);
    let consumer = Arc::new(MockConsumer::new("opensea"));
    consumer.subscribe(&["wallets".to_string()]).await.unwrap();

    let group = PriorityConsumer::new(
        consumer.clone(),
        harness.fact_processor(source),
        "wallets",
        None,
    );

    let delivery = fixtures::delivery("wallets", 100, &fixtures::addresses(75));
    let report = group.process(&delivery).await.unwrap();

    assert_eq!(report.windows, 2);
    assert_eq!(consumer.pings(), 2);
    assert_eq!(consumer.commits(), vec![("wallets".to_string(), 175)]);
    assert_eq!(harness.store.fact_count(), 1);
}

/// A commit after the session expired leaves the batch for redelivery.
#[tokio::test]
async fn test_expired_session_redelivers() {
    let harness = Harness::new();
    let store: Arc<MemoryStore> = harness.store.clone();
    let source = social_source(&[]);
    let consumer = Arc::new(MockConsumer::new("opensea"));
    consumer.subscribe(&["wallets".to_string()]).await.unwrap();
    consumer.set_expire_commits(true);

    let group = PriorityConsumer::new(
        consumer.clone(),
        harness.fact_processor(source.clone()),
        "wallets",
        None,
    );

    let delivery = fixtures::delivery("wallets", 0, &fixtures::addresses(10));
    group.process(&delivery).await.expect("expired commit is not fatal");
    assert!(consumer.commits().is_empty());

    consumer.set_expire_commits(false);
    let redelivered = consumer.next_batch().await.unwrap().expect("batch is redelivered");
    assert_eq!(redelivered.next_offset(), Some(10));

    let report = group.process(&redelivered).await.unwrap();
    assert_eq!(report.resolved, 0, "the first pass already cached the window");
    assert_eq!(store.cache_len(), 10);
    assert_eq!(consumer.commits(), vec![("wallets".to_string(), 10)]);
}
