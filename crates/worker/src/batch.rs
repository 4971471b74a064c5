//! Window-by-window processing of a delivered batch.

use crate::cache_gate::CacheGate;
use crate::resolver::BoundedResolver;
use crate::sink::WindowSink;
use engine_core::{normalize_payloads, Address, Result};
use redpanda::Heartbeat;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{error, info, warn};

/// Default addresses per window.
pub const DEFAULT_WINDOW_SIZE: usize = 50;

/// Counts for one processed batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub invalid: usize,
    pub windows: usize,
    /// Addresses sent to the resolver
    pub resolved: usize,
    pub enriched: usize,
    /// Windows whose results could not be persisted
    pub failed_windows: usize,
}

/// Normalizes a batch, splits it into windows and drives each window
/// through cache gate, resolver and sink.
pub struct BatchProcessor {
    gate: CacheGate,
    resolver: BoundedResolver,
    sink: Arc<dyn WindowSink>,
    window_size: usize,
    window_pause: Duration,
}

impl BatchProcessor {
    pub fn new(gate: CacheGate, resolver: BoundedResolver, sink: Arc<dyn WindowSink>) -> Self {
        let window_pause = resolver.window_pause();
        Self {
            gate,
            resolver,
            sink,
            window_size: DEFAULT_WINDOW_SIZE,
            window_pause,
        }
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn with_window_pause(mut self, pause: Duration) -> Self {
        self.window_pause = pause;
        self
    }

    pub fn resolver(&self) -> &BoundedResolver {
        &self.resolver
    }

    /// Processes raw payloads in order.
    ///
    /// Windows run one after another with `heartbeat.ping()` after each.
    /// A window that fails to persist is logged and skipped; only a failed
    /// ping ends the batch early, since the session is gone by then.
    pub async fn handle<'a, I, H>(&self, payloads: I, heartbeat: &H) -> Result<BatchReport>
    where
        I: IntoIterator<Item = Option<&'a [u8]>>,
        H: Heartbeat + ?Sized,
    {
        let start = Instant::now();
        let normalized = normalize_payloads(payloads);

        let mut report = BatchReport {
            received: normalized.addresses.len() + normalized.rejected,
            invalid: normalized.rejected,
            ..BatchReport::default()
        };

        metrics().addresses_received.inc_by(report.received as u64);
        metrics().addresses_invalid.inc_by(report.invalid as u64);

        info!(
            source = %self.resolver.source(),
            received = report.received,
            invalid = report.invalid,
            "Processing batch"
        );

        let windows: Vec<&[Address]> = normalized.addresses.chunks(self.window_size).collect();

        for (index, window) in windows.into_iter().enumerate() {
            let full = window.len() == self.window_size;
            self.process_window(index, window, &mut report).await;
            report.windows += 1;

            heartbeat.ping().await?;

            // Rate-limited services get a breather after every full window.
            if full && !self.window_pause.is_zero() {
                tokio::time::sleep(self.window_pause).await;
            }
        }

        let elapsed = start.elapsed();
        metrics().batch_latency_ms.observe(elapsed.as_millis() as u64);

        info!(
            source = %self.resolver.source(),
            windows = report.windows,
            resolved = report.resolved,
            enriched = report.enriched,
            failed_windows = report.failed_windows,
            latency_ms = %elapsed.as_millis(),
            "Finished batch"
        );

        Ok(report)
    }

    async fn process_window(&self, index: usize, window: &[Address], report: &mut BatchReport) {
        let start = Instant::now();
        let source = self.resolver.source();

        let pending = self.gate.filter_unresolved(window, source).await;
        if !pending.is_empty() {
            let results = self.resolver.resolve(&pending).await;
            report.resolved += pending.len();
            report.enriched += results.iter().filter(|r| r.is_enriched()).count();

            match self.sink.persist(&results).await {
                Ok(()) => {
                    if let Err(e) = self.gate.refresh(&pending, source).await {
                        metrics().persist_errors.inc();
                        warn!(window = index, source = %source, "Failed to refresh cache: {}", e);
                    }
                }
                Err(e) => {
                    // Leave the cache untouched so a redelivery retries the lookups.
                    metrics().persist_errors.inc();
                    report.failed_windows += 1;
                    error!(
                        window = index,
                        source = %source,
                        count = results.len(),
                        "Failed to persist window: {}",
                        e
                    );
                }
            }
        }

        metrics().windows_processed.inc();
        metrics().window_latency_ms.observe(start.elapsed().as_millis() as u64);
    }
}
