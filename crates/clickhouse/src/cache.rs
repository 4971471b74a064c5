//! Lookup cache persistence.

use crate::client::{read_error, write_error, ClickHouseClient};
use crate::store::CacheStore;
use async_trait::async_trait;
use chrono::DateTime;
use clickhouse::Row;
use engine_core::{Address, CacheEntry, Result, Source};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Cache row for ClickHouse.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct CacheRow {
    pub address: String,
    pub source: String,
    pub next_lookup_at: i64, // milliseconds since epoch
}

impl From<&CacheEntry> for CacheRow {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            address: entry.address.to_string(),
            source: entry.source.as_str().to_string(),
            next_lookup_at: entry.next_lookup_at.timestamp_millis(),
        }
    }
}

#[async_trait]
impl CacheStore for ClickHouseClient {
    async fn cache_entries(&self, addresses: &[Address], source: Source) -> Result<Vec<CacheEntry>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<&str> = addresses.iter().map(Address::as_str).collect();
        let rows: Vec<CacheRow> = self
            .inner()
            .query(
                "SELECT address, source, next_lookup_at FROM address_cache FINAL \
                 WHERE source = ? AND has(?, address)",
            )
            .bind(source.as_str())
            .bind(keys)
            .fetch_all()
            .await
            .map_err(|e| read_error("Cache lookup failed", e))?;

        let entries = rows
            .into_iter()
            .filter_map(|row| {
                let address = Address::parse(&row.address)?;
                let Some(next_lookup_at) = DateTime::from_timestamp_millis(row.next_lookup_at) else {
                    warn!(address = %row.address, "Dropping cache row with out-of-range timestamp");
                    return None;
                };
                Some(CacheEntry {
                    address,
                    source,
                    next_lookup_at,
                })
            })
            .collect();

        Ok(entries)
    }

    async fn upsert_cache(&self, entries: &[CacheEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut insert = self
            .inner()
            .insert("address_cache")
            .map_err(|e| write_error("Insert error", e))?;
        for entry in entries {
            insert
                .write(&CacheRow::from(entry))
                .await
                .map_err(|e| write_error("Write error", e))?;
        }
        insert.end().await.map_err(|e| write_error("End error", e))?;

        debug!(count = entries.len(), "Refreshed cache entries");
        Ok(entries.len())
    }
}
