//! ClickHouse implementations of the store traits.
//!
//! Runs against a ClickHouse testcontainer, or the server named by
//! `ENRICHER_TEST_CLICKHOUSE_URL`; skipped when neither is available.
//! Tests share one database, so each uses its own address range.

use chrono::Duration;
use clickhouse_client::{query_current_names, query_facts, CacheStore, FactStore, NameStore};
use engine_core::{CacheEntry, ManualClock, NameOutcome, Source};
use integration_tests::{fixtures, setup::ClickHouseContext};
use redpanda::{OffsetKey, OffsetStore};
use std::sync::Arc;
use worker::Reconciler;

#[tokio::test]
async fn test_cache_upsert_keeps_one_row_per_key() {
    let Some(ctx) = ClickHouseContext::new().await else {
        return;
    };
    let addresses: Vec<_> = (1001..=1003).map(fixtures::address).collect();

    let entries = |at: chrono::DateTime<chrono::Utc>| -> Vec<CacheEntry> {
        addresses
            .iter()
            .map(|a| CacheEntry {
                address: a.clone(),
                source: Source::Opensea,
                next_lookup_at: at,
            })
            .collect()
    };

    let first = fixtures::t0() + Duration::days(14);
    let second = first + Duration::days(14);
    ctx.clickhouse.upsert_cache(&entries(first)).await.unwrap();
    ctx.clickhouse.upsert_cache(&entries(second)).await.unwrap();

    let stored = ctx
        .clickhouse
        .cache_entries(&addresses, Source::Opensea)
        .await
        .unwrap();
    assert_eq!(stored.len(), 3);
    assert!(stored.iter().all(|e| e.next_lookup_at == second));

    let other_source = ctx.clickhouse.cache_entries(&addresses, Source::Ens).await.unwrap();
    assert!(other_source.is_empty());
}

#[tokio::test]
async fn test_fact_upsert_replaces_by_external_id() {
    let Some(ctx) = ClickHouseContext::new().await else {
        return;
    };
    let address = fixtures::address(2001);

    let mut fact = fixtures::social_fact(&address, "gmi");
    ctx.clickhouse.upsert_facts(&[fact.clone()]).await.unwrap();
    fact.follower_count = 1000;
    ctx.clickhouse.upsert_facts(&[fact]).await.unwrap();

    let rows = query_facts(&ctx.clickhouse, address.as_str()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].follower_count, 1000);
    assert_eq!(rows[0].handle, "gmi");
    assert_eq!(rows[0].source, "opensea");
}

#[tokio::test]
async fn test_name_reconciliation_in_clickhouse() {
    let Some(ctx) = ClickHouseContext::new().await else {
        return;
    };
    let clock = Arc::new(ManualClock::new(fixtures::t0()));
    let reconciler = Reconciler::new(ctx.clickhouse.clone(), clock.clone());
    let address = fixtures::address(3001);

    reconciler
        .reconcile(&[NameOutcome::named(address.clone(), "alice.eth")])
        .await
        .unwrap();
    clock.advance(Duration::days(1));
    reconciler
        .reconcile(&[NameOutcome::named(address.clone(), "bob.eth")])
        .await
        .unwrap();

    let current = query_current_names(&ctx.clickhouse, &[address.as_str()]).await.unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].name, "bob.eth");

    let mut records = ctx.clickhouse.name_records(&[address.clone()]).await.unwrap();
    records.sort_by_key(|r| r.valid_from);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].valid_to, Some(fixtures::t0() + Duration::days(1)));

    // Same input again: nothing to write.
    let plan = reconciler
        .reconcile(&[NameOutcome::named(address, "bob.eth")])
        .await
        .unwrap();
    assert!(plan.is_empty());
}

#[tokio::test]
async fn test_offsets_round_trip() {
    let Some(ctx) = ClickHouseContext::new().await else {
        return;
    };
    let key = OffsetKey::new("offsets-test", "wallets", 0);

    assert_eq!(ctx.clickhouse.load(&key).await.unwrap(), None);

    ctx.clickhouse.save(&key, 50).await.unwrap();
    ctx.clickhouse.save(&key, 120).await.unwrap();
    assert_eq!(ctx.clickhouse.load(&key).await.unwrap(), Some(120));

    let other = OffsetKey::new("offsets-test", "wallets", 1);
    assert_eq!(ctx.clickhouse.load(&other).await.unwrap(), None);
}
