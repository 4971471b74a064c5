//! Internal metrics collection.
//!
//! Collects metrics in-memory and periodically flushes to ClickHouse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, 60s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    // External lookups are slow; bounds are tuned for seconds, not microseconds.
    const BUCKET_BOUNDS: [u64; 11] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the enrichment engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Consumption
    pub batches_consumed: Counter,
    pub addresses_received: Counter,
    pub addresses_invalid: Counter,
    pub windows_processed: Counter,
    pub heartbeats: Counter,
    pub session_expirations: Counter,
    pub consumer_restarts: Counter,

    // Priority admission
    pub low_priority_pauses: Counter,
    pub low_priority_resumes: Counter,
    pub low_priority_paused: Gauge,
    pub high_priority_lag: Gauge,

    // Cache gate
    pub cache_hits: Counter,
    pub cache_misses: Counter,

    // External lookups
    pub resolver_calls: Counter,
    pub resolver_errors: Counter,
    pub usernames_rejected: Counter,
    pub name_verifications_failed: Counter,

    // Persistence
    pub facts_written: Counter,
    pub names_written: Counter,
    pub names_invalidated: Counter,
    pub persist_errors: Counter,

    // Producer
    pub addresses_published: Counter,
    pub publish_errors: Counter,

    // Latency histograms
    pub resolver_latency_ms: Histogram,
    pub window_latency_ms: Histogram,
    pub batch_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
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
    pub low_priority_paused: bool,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            batches_consumed: self.batches_consumed.get(),
            addresses_received: self.addresses_received.get(),
            addresses_invalid: self.addresses_invalid.get(),
            windows_processed: self.windows_processed.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            resolver_calls: self.resolver_calls.get(),
            resolver_errors: self.resolver_errors.get(),
            facts_written: self.facts_written.get(),
            names_written: self.names_written.get(),
            names_invalidated: self.names_invalidated.get(),
            persist_errors: self.persist_errors.get(),
            session_expirations: self.session_expirations.get(),
            resolver_latency_mean_ms: self.resolver_latency_ms.mean(),
            window_latency_mean_ms: self.window_latency_ms.mean(),
            high_priority_lag: self.high_priority_lag.get(),
            low_priority_paused: self.low_priority_paused.get() > 0,
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
