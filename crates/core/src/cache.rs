//! Lookup cache entries and TTL policy.

use crate::address::Address;
use crate::enrichment::Source;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default time before an address is looked up again for the same source.
pub const DEFAULT_CACHE_TTL_DAYS: i64 = 14;

/// "Do not resolve `address` for `source` before `next_lookup_at`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub address: Address,
    pub source: Source,
    pub next_lookup_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry still suppresses lookups at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.next_lookup_at > now
    }
}

/// TTL applied on every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
}

impl CachePolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_days(days: i64) -> Self {
        Self::new(Duration::days(days))
    }

    /// Next lookup time for an attempt made at `now`.
    pub fn next_lookup(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.ttl
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_days(DEFAULT_CACHE_TTL_DAYS)
    }
}
