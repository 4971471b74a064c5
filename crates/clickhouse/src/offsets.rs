//! Consumer offsets persisted in ClickHouse.

use crate::client::{read_error, write_error, ClickHouseClient};
use async_trait::async_trait;
use chrono::Utc;
use clickhouse::Row;
use engine_core::Result;
use redpanda::{OffsetKey, OffsetStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
struct OffsetRow {
    group_id: String,
    topic: String,
    partition_id: i32,
    next_offset: i64,
    updated_at: i64,
}

#[async_trait]
impl OffsetStore for ClickHouseClient {
    async fn load(&self, key: &OffsetKey) -> Result<Option<i64>> {
        self.inner()
            .query(
                "SELECT next_offset FROM consumer_offsets FINAL \
                 WHERE group_id = ? AND topic = ? AND partition_id = ?",
            )
            .bind(&key.group_id)
            .bind(&key.topic)
            .bind(key.partition)
            .fetch_optional::<i64>()
            .await
            .map_err(|e| read_error("Offset lookup failed", e))
    }

    async fn save(&self, key: &OffsetKey, offset: i64) -> Result<()> {
        let row = OffsetRow {
            group_id: key.group_id.clone(),
            topic: key.topic.clone(),
            partition_id: key.partition,
            next_offset: offset,
            updated_at: Utc::now().timestamp_millis(),
        };

        let mut insert = self
            .inner()
            .insert("consumer_offsets")
            .map_err(|e| write_error("Insert error", e))?;
        insert
            .write(&row)
            .await
            .map_err(|e| write_error("Write error", e))?;
        insert.end().await.map_err(|e| write_error("End error", e))?;

        Ok(())
    }
}
