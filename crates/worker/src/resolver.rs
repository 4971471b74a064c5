//! Bounded enrichment over pluggable sources.

use async_trait::async_trait;
use engine_core::{Address, EnrichmentResult, Source};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, warn};

/// An external lookup capability.
///
/// Implementations never fail as a whole: a lookup that errors or times out
/// yields [`EnrichmentResult::Empty`] for the affected addresses.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    fn source(&self) -> Source;

    /// Longest a single window may take; sizes the consumer session timeout.
    fn max_execution_time(&self) -> Duration;

    /// Pause between windows for rate-limited services.
    fn window_pause(&self) -> Duration {
        Duration::ZERO
    }

    async fn resolve_batch(&self, addresses: &[Address]) -> Vec<EnrichmentResult>;
}

/// Runs `f` once per item with at most `limit` calls in flight.
///
/// Results come back in completion order. The calls are built up front so
/// the returned future stays `Send` when `f` borrows from the caller.
pub async fn bounded<'a, T, F, Fut, R>(items: &'a [T], limit: usize, f: F) -> Vec<R>
where
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = R> + Send + 'a,
{
    let calls: Vec<BoxFuture<'a, R>> = items.iter().map(|item| f(item).boxed()).collect();

    stream::iter(calls)
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}

/// Front end for a source: records timing and guarantees one result per
/// input address.
#[derive(Clone)]
pub struct BoundedResolver {
    source: Arc<dyn EnrichmentSource>,
}

impl BoundedResolver {
    pub fn new(source: Arc<dyn EnrichmentSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> Source {
        self.source.source()
    }

    pub fn max_execution_time(&self) -> Duration {
        self.source.max_execution_time()
    }

    pub fn window_pause(&self) -> Duration {
        self.source.window_pause()
    }

    pub async fn resolve(&self, addresses: &[Address]) -> Vec<EnrichmentResult> {
        if addresses.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        let results = self.source.resolve_batch(addresses).await;
        let elapsed = start.elapsed();

        metrics().resolver_calls.inc_by(addresses.len() as u64);
        metrics().resolver_latency_ms.observe(elapsed.as_millis() as u64);

        let aligned = align_results(addresses, self.source(), results);
        let enriched = aligned.iter().filter(|r| r.is_enriched()).count();

        debug!(
            source = %self.source(),
            count = addresses.len(),
            enriched = enriched,
            latency_ms = %elapsed.as_millis(),
            "Resolved window"
        );

        aligned
    }
}

/// One result per address in input order.
///
/// Missing addresses become `Empty`; results for addresses that were not
/// asked for, or from another source, are dropped. When a source returns
/// several results for one address an enriched one wins.
pub fn align_results(
    addresses: &[Address],
    source: Source,
    results: Vec<EnrichmentResult>,
) -> Vec<EnrichmentResult> {
    let mut by_address: HashMap<Address, EnrichmentResult> = HashMap::with_capacity(results.len());
    let mut stray = 0usize;

    for result in results {
        if result.source() != source {
            stray += 1;
            continue;
        }
        match by_address.get(result.address()) {
            Some(existing) if existing.is_enriched() => {}
            _ => {
                by_address.insert(result.address().clone(), result);
            }
        }
    }

    let aligned: Vec<EnrichmentResult> = addresses
        .iter()
        .map(|address| {
            by_address
                .remove(address)
                .unwrap_or_else(|| EnrichmentResult::empty(address.clone(), source))
        })
        .collect();

    stray += by_address.len();
    if stray > 0 {
        warn!(source = %source, count = stray, "Dropped results for addresses not in the window");
    }

    aligned
}
