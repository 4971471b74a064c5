//! Query functions for reading data back (used in tests and admin).

use crate::client::{read_error, write_error, ClickHouseClient};
use crate::facts::FactRow;
use crate::schema::STATE_TABLES;
use clickhouse::Row;
use engine_core::Result;
use serde::Deserialize;

/// Count facts stored for one source.
pub async fn count_facts(client: &ClickHouseClient, source: &str) -> Result<u64> {
    client
        .inner()
        .query("SELECT count() FROM wallet_facts FINAL WHERE source = ?")
        .bind(source)
        .fetch_one()
        .await
        .map_err(|e| read_error("Query error", e))
}

/// Count cache entries for one source.
pub async fn count_cache_entries(client: &ClickHouseClient, source: &str) -> Result<u64> {
    client
        .inner()
        .query("SELECT count() FROM address_cache FINAL WHERE source = ?")
        .bind(source)
        .fetch_one()
        .await
        .map_err(|e| read_error("Query error", e))
}

/// Fetch the facts for an address.
pub async fn query_facts(client: &ClickHouseClient, address: &str) -> Result<Vec<FactRow>> {
    client
        .inner()
        .query(
            "SELECT address, external_id, source, url, name, avatar_url, handle, \
             follower_count, location, bio, updated_at \
             FROM wallet_facts FINAL WHERE address = ? ORDER BY external_id",
        )
        .bind(address)
        .fetch_all()
        .await
        .map_err(|e| read_error("Query error", e))
}

/// Currently valid name for an address.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct CurrentName {
    pub address: String,
    pub name: String,
}

/// Fetch names that are currently valid for any of `addresses`.
pub async fn query_current_names(
    client: &ClickHouseClient,
    addresses: &[&str],
) -> Result<Vec<CurrentName>> {
    client
        .inner()
        .query(
            "SELECT address, name FROM name_records FINAL \
             WHERE has(?, address) AND valid_to IS NULL ORDER BY address",
        )
        .bind(addresses)
        .fetch_all()
        .await
        .map_err(|e| read_error("Query error", e))
}

/// Truncate all pipeline state (test cleanup).
pub async fn truncate_state(client: &ClickHouseClient) -> Result<()> {
    for table in STATE_TABLES {
        client
            .inner()
            .query(&format!("TRUNCATE TABLE IF EXISTS {}", table))
            .execute()
            .await
            .map_err(|e| write_error("Truncate error", e))?;
    }
    Ok(())
}
