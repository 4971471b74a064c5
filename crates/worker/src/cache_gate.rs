//! Cache-aside filter in front of the resolver.

use clickhouse_client::CacheStore;
use engine_core::{Address, CacheEntry, CachePolicy, Clock, Result, Source};
use std::collections::HashSet;
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, warn};

/// Skips addresses looked up recently and remembers every new lookup.
pub struct CacheGate {
    store: Arc<dyn CacheStore>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl CacheGate {
    pub fn new(store: Arc<dyn CacheStore>, policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    /// Addresses with no fresh cache entry for `source`, first occurrence order.
    ///
    /// Uses one batched lookup. If the lookup fails everything is treated
    /// as unresolved.
    pub async fn filter_unresolved(&self, addresses: &[Address], source: Source) -> Vec<Address> {
        let mut seen = HashSet::with_capacity(addresses.len());
        let unique: Vec<Address> = addresses
            .iter()
            .filter(|a| seen.insert(*a))
            .cloned()
            .collect();

        let entries = match self.store.cache_entries(&unique, source).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(source = %source, count = unique.len(), "Cache lookup failed, resolving all: {}", e);
                return unique;
            }
        };

        let now = self.clock.now();
        let fresh: HashSet<&Address> = entries
            .iter()
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| &entry.address)
            .collect();

        let pending: Vec<Address> = unique
            .iter()
            .filter(|a| !fresh.contains(a))
            .cloned()
            .collect();

        let hits = unique.len() - pending.len();
        metrics().cache_hits.inc_by(hits as u64);
        metrics().cache_misses.inc_by(pending.len() as u64);
        debug!(source = %source, hits = hits, misses = pending.len(), "Checked cache");

        pending
    }

    /// Pushes `next_lookup_at` out by the TTL for every address.
    pub async fn refresh(&self, addresses: &[Address], source: Source) -> Result<usize> {
        let next_lookup_at = self.policy.next_lookup(self.clock.now());
        let entries: Vec<CacheEntry> = addresses
            .iter()
            .map(|address| CacheEntry {
                address: address.clone(),
                source,
                next_lookup_at,
            })
            .collect();

        self.store.upsert_cache(&entries).await
    }
}
