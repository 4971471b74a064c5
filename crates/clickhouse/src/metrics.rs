//! Internal metrics snapshots.

use crate::client::{write_error, ClickHouseClient};
use clickhouse::Row;
use engine_core::Result;
use serde::Serialize;
use telemetry::MetricsSnapshot;

/// Internal metrics row for ClickHouse.
#[derive(Debug, Clone, Row, Serialize)]
pub struct MetricsRow {
    pub timestamp: i64,
    pub batches_consumed: u64,
    pub addresses_received: u64,
    pub addresses_invalid: u64,
    pub windows_processed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub resolver_calls: u64,
    pub resolver_errors: u64,
    pub facts_written: u64,
    pub names_written: u64,
    pub names_invalidated: u64,
    pub persist_errors: u64,
    pub session_expirations: u64,
    pub resolver_latency_mean_ms: f64,
    pub window_latency_mean_ms: f64,
    pub high_priority_lag: u64,
    pub low_priority_paused: u8,
}

impl From<MetricsSnapshot> for MetricsRow {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp.timestamp_millis(),
            batches_consumed: snapshot.batches_consumed,
            addresses_received: snapshot.addresses_received,
            addresses_invalid: snapshot.addresses_invalid,
            windows_processed: snapshot.windows_processed,
            cache_hits: snapshot.cache_hits,
            cache_misses: snapshot.cache_misses,
            resolver_calls: snapshot.resolver_calls,
            resolver_errors: snapshot.resolver_errors,
            facts_written: snapshot.facts_written,
            names_written: snapshot.names_written,
            names_invalidated: snapshot.names_invalidated,
            persist_errors: snapshot.persist_errors,
            session_expirations: snapshot.session_expirations,
            resolver_latency_mean_ms: snapshot.resolver_latency_mean_ms,
            window_latency_mean_ms: snapshot.window_latency_mean_ms,
            high_priority_lag: snapshot.high_priority_lag,
            low_priority_paused: u8::from(snapshot.low_priority_paused),
        }
    }
}

/// Insert internal metrics snapshot.
pub async fn insert_metrics(client: &ClickHouseClient, snapshot: MetricsSnapshot) -> Result<()> {
    let row = MetricsRow::from(snapshot);

    let mut insert = client
        .inner()
        .insert("internal_metrics")
        .map_err(|e| write_error("Insert error", e))?;

    insert
        .write(&row)
        .await
        .map_err(|e| write_error("Write error", e))?;

    insert.end().await.map_err(|e| write_error("End error", e))?;

    Ok(())
}
