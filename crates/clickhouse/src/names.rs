//! Name record persistence.

use crate::client::{read_error, write_error, ClickHouseClient};
use crate::store::NameStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Row;
use engine_core::{Address, NameRecord, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name record row for ClickHouse.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct NameRow {
    pub address: String,
    pub name: String,
    pub valid_from: i64,
    pub valid_to: Option<i64>,
    pub updated_at: i64,
}

impl NameRow {
    fn new(record: &NameRecord, updated_at: i64) -> Self {
        Self {
            address: record.address.to_string(),
            name: record.name.clone(),
            valid_from: record.valid_from.timestamp_millis(),
            valid_to: record.valid_to.map(|t| t.timestamp_millis()),
            updated_at,
        }
    }

    fn into_record(self) -> Option<NameRecord> {
        Some(NameRecord {
            address: Address::parse(&self.address)?,
            name: self.name,
            valid_from: DateTime::from_timestamp_millis(self.valid_from)?,
            valid_to: match self.valid_to {
                Some(ms) => Some(DateTime::from_timestamp_millis(ms)?),
                None => None,
            },
        })
    }
}

#[async_trait]
impl NameStore for ClickHouseClient {
    async fn name_records(&self, addresses: &[Address]) -> Result<Vec<NameRecord>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<&str> = addresses.iter().map(Address::as_str).collect();
        let rows: Vec<NameRow> = self
            .inner()
            .query(
                "SELECT address, name, valid_from, valid_to, updated_at FROM name_records FINAL \
                 WHERE has(?, address)",
            )
            .bind(keys)
            .fetch_all()
            .await
            .map_err(|e| read_error("Name lookup failed", e))?;

        Ok(rows.into_iter().filter_map(NameRow::into_record).collect())
    }

    async fn write_names(&self, records: &[NameRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let updated_at = Utc::now().timestamp_millis();
        let mut insert = self
            .inner()
            .insert("name_records")
            .map_err(|e| write_error("Insert error", e))?;
        for record in records {
            insert
                .write(&NameRow::new(record, updated_at))
                .await
                .map_err(|e| write_error("Write error", e))?;
        }
        insert.end().await.map_err(|e| write_error("End error", e))?;

        debug!(count = records.len(), "Wrote name records");
        Ok(records.len())
    }
}
