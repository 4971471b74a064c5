//! Enriched fact persistence.

use crate::client::{write_error, ClickHouseClient};
use crate::store::FactStore;
use async_trait::async_trait;
use chrono::Utc;
use clickhouse::Row;
use engine_core::{ProfileFact, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fact row for ClickHouse.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct FactRow {
    pub address: String,
    pub external_id: String,
    pub source: String,
    pub url: String,
    pub name: String,
    pub avatar_url: String,
    pub handle: String,
    pub follower_count: u64,
    pub location: String,
    pub bio: String,
    pub updated_at: i64,
}

impl FactRow {
    fn new(fact: &ProfileFact, updated_at: i64) -> Self {
        Self {
            address: fact.address.to_string(),
            external_id: fact.external_id.clone(),
            source: fact.source.as_str().to_string(),
            url: fact.url.clone(),
            name: fact.name.clone(),
            avatar_url: fact.avatar_url.clone(),
            handle: fact.handle.clone(),
            follower_count: fact.follower_count,
            location: fact.location.clone(),
            bio: fact.bio.clone(),
            updated_at,
        }
    }
}

#[async_trait]
impl FactStore for ClickHouseClient {
    async fn upsert_facts(&self, facts: &[ProfileFact]) -> Result<usize> {
        if facts.is_empty() {
            return Ok(0);
        }

        let start = std::time::Instant::now();
        let updated_at = Utc::now().timestamp_millis();

        let mut insert = self
            .inner()
            .insert("wallet_facts")
            .map_err(|e| write_error("Insert error", e))?;
        for fact in facts {
            insert
                .write(&FactRow::new(fact, updated_at))
                .await
                .map_err(|e| write_error("Write error", e))?;
        }
        insert.end().await.map_err(|e| write_error("End error", e))?;

        debug!(
            count = facts.len(),
            latency_ms = %start.elapsed().as_millis(),
            "Upserted wallet facts"
        );

        Ok(facts.len())
    }
}
