//! ClickHouse table schemas.
//!
//! Upsert semantics come from ReplacingMergeTree: rows sharing an ORDER BY
//! key collapse to the one with the highest version column, and reads use
//! `FINAL` so unmerged parts are collapsed at query time.

/// SQL for creating the database.
pub const CREATE_DATABASE: &str = r#"
CREATE DATABASE IF NOT EXISTS enrichment
"#;

/// Lookup cache: one row per (address, source).
///
/// Versioned by `next_lookup_at`, so a refresh only ever moves it forward.
pub const CREATE_ADDRESS_CACHE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS enrichment.address_cache (
    address String,
    source LowCardinality(String),
    next_lookup_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(next_lookup_at)
ORDER BY (address, source)
SETTINGS index_granularity = 8192
"#;

/// Enriched profile facts, unique on (address, external_id).
pub const CREATE_WALLET_FACTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS enrichment.wallet_facts (
    address String,
    external_id String,
    source LowCardinality(String),
    url String,
    name String,
    avatar_url String,
    handle String,
    follower_count UInt64,
    location String,
    bio String,
    updated_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (address, external_id)
SETTINGS index_granularity = 8192
"#;

/// Name validity intervals, unique on (address, name).
///
/// Invalidation and re-validation rewrite the row with a newer `updated_at`.
pub const CREATE_NAME_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS enrichment.name_records (
    address String,
    name String,
    valid_from DateTime64(3),
    valid_to Nullable(DateTime64(3)),
    updated_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (address, name)
SETTINGS index_granularity = 8192
"#;

/// Committed consumer-group positions.
pub const CREATE_CONSUMER_OFFSETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS enrichment.consumer_offsets (
    group_id String,
    topic String,
    partition_id Int32,
    next_offset Int64,
    updated_at DateTime64(3)
)
ENGINE = ReplacingMergeTree(updated_at)
ORDER BY (group_id, topic, partition_id)
"#;

/// SQL for creating the internal metrics table.
pub const CREATE_METRICS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS enrichment.internal_metrics (
    timestamp DateTime64(3),
    batches_consumed UInt64,
    addresses_received UInt64,
    addresses_invalid UInt64,
    windows_processed UInt64,
    cache_hits UInt64,
    cache_misses UInt64,
    resolver_calls UInt64,
    resolver_errors UInt64,
    facts_written UInt64,
    names_written UInt64,
    names_invalidated UInt64,
    persist_errors UInt64,
    session_expirations UInt64,
    resolver_latency_mean_ms Float64,
    window_latency_mean_ms Float64,
    high_priority_lag UInt64,
    low_priority_paused UInt8
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(timestamp)
ORDER BY timestamp
TTL toDateTime(timestamp) + INTERVAL 30 DAY
"#;

/// All table creation statements.
pub fn all_tables() -> Vec<&'static str> {
    vec![
        CREATE_DATABASE,
        CREATE_ADDRESS_CACHE_TABLE,
        CREATE_WALLET_FACTS_TABLE,
        CREATE_NAME_RECORDS_TABLE,
        CREATE_CONSUMER_OFFSETS_TABLE,
        CREATE_METRICS_TABLE,
    ]
}

/// Tables holding pipeline state, for test cleanup.
pub const STATE_TABLES: &[&str] = &[
    "address_cache",
    "wallet_facts",
    "name_records",
    "consumer_offsets",
];
