//! Where a window's results are persisted.

use crate::reconcile::Reconciler;
use async_trait::async_trait;
use clickhouse_client::FactStore;
use engine_core::{enriched_facts, EnrichmentResult, NameOutcome, Result};
use std::sync::Arc;
use telemetry::metrics;
use tracing::debug;

#[async_trait]
pub trait WindowSink: Send + Sync {
    async fn persist(&self, results: &[EnrichmentResult]) -> Result<()>;
}

/// Upserts enriched facts; empty results write nothing.
pub struct FactSink {
    store: Arc<dyn FactStore>,
}

impl FactSink {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl WindowSink for FactSink {
    async fn persist(&self, results: &[EnrichmentResult]) -> Result<()> {
        let facts = enriched_facts(results);
        if facts.is_empty() {
            debug!(count = results.len(), "No facts to write");
            return Ok(());
        }

        let written = self.store.upsert_facts(&facts).await?;
        metrics().facts_written.inc_by(written as u64);
        Ok(())
    }
}

/// Feeds name outcomes through the reconciler.
pub struct NameSink {
    reconciler: Reconciler,
}

impl NameSink {
    pub fn new(reconciler: Reconciler) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl WindowSink for NameSink {
    async fn persist(&self, results: &[EnrichmentResult]) -> Result<()> {
        let outcomes: Vec<NameOutcome> = results.iter().map(NameOutcome::from).collect();
        self.reconciler.reconcile(&outcomes).await?;
        Ok(())
    }
}
