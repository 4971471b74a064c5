//! Storage seams used by the enrichment pipeline.
//!
//! [`ClickHouseClient`](crate::ClickHouseClient) implements all three; tests
//! substitute an in-memory store.

use async_trait::async_trait;
use engine_core::{Address, CacheEntry, NameRecord, ProfileFact, Result, Source};

/// Lookup cache keyed by `(address, source)`.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Entries for `addresses` under `source`, in one round trip.
    ///
    /// Addresses that were never looked up have no entry.
    async fn cache_entries(&self, addresses: &[Address], source: Source) -> Result<Vec<CacheEntry>>;

    /// Inserts or advances entries. Only `next_lookup_at` changes on conflict.
    async fn upsert_cache(&self, entries: &[CacheEntry]) -> Result<usize>;
}

/// Enriched facts keyed by `(address, external_id)`.
#[async_trait]
pub trait FactStore: Send + Sync {
    async fn upsert_facts(&self, facts: &[ProfileFact]) -> Result<usize>;
}

/// Name validity intervals keyed by `(address, name)`.
#[async_trait]
pub trait NameStore: Send + Sync {
    /// Every record for `addresses`, valid and invalidated.
    async fn name_records(&self, addresses: &[Address]) -> Result<Vec<NameRecord>>;

    /// Writes records as one batched statement, replacing rows with the same key.
    async fn write_names(&self, records: &[NameRecord]) -> Result<usize>;
}
