//! Name record reconciliation.
//!
//! Each window is planned against an explicit snapshot of the stored
//! records for its addresses, then written as at most three batched
//! statements: upserts, invalidations caused by a changed name, and
//! invalidations caused by a missing name.

use chrono::{DateTime, Utc};
use clickhouse_client::NameStore;
use engine_core::{Address, Clock, NameOutcome, NameRecord, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use telemetry::metrics;
use tracing::{debug, info};

/// Stored records per address, valid and invalidated.
#[derive(Debug, Default, Clone)]
pub struct NameSnapshot {
    records: HashMap<Address, Vec<NameRecord>>,
}

impl NameSnapshot {
    pub fn new(records: Vec<NameRecord>) -> Self {
        let mut snapshot = Self::default();
        for record in records {
            snapshot
                .records
                .entry(record.address.clone())
                .or_default()
                .push(record);
        }
        snapshot
    }

    fn records(&self, address: &Address) -> &[NameRecord] {
        self.records.get(address).map(Vec::as_slice).unwrap_or(&[])
    }

    fn find(&self, address: &Address, name: &str) -> Option<&NameRecord> {
        self.records(address).iter().find(|r| r.name == name)
    }

    fn valid(&self, address: &Address) -> impl Iterator<Item = &NameRecord> {
        self.records(address).iter().filter(|r| r.is_valid())
    }
}

/// Rows to write for one window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NamePlan {
    /// New or re-validated `(address, name)` pairs
    pub upserts: Vec<NameRecord>,
    /// Valid rows superseded by a different verified name
    pub invalidate_changed: Vec<NameRecord>,
    /// Valid rows of addresses that no longer resolve
    pub invalidate_missing: Vec<NameRecord>,
}

impl NamePlan {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.invalidate_changed.is_empty() && self.invalidate_missing.is_empty()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidate_changed.len() + self.invalidate_missing.len()
    }
}

/// Computes the writes that bring stored records in line with `outcomes`.
///
/// Pairs that are already valid produce no writes, so planning the same
/// outcomes against the result of a previous plan is empty. If an address
/// appears more than once the last outcome wins.
pub fn plan(outcomes: &[NameOutcome], snapshot: &NameSnapshot, now: DateTime<Utc>) -> NamePlan {
    let latest: BTreeMap<&Address, Option<&str>> = outcomes
        .iter()
        .map(|o| (&o.address, o.name.as_deref()))
        .collect();

    let mut plan = NamePlan::default();

    for (address, name) in latest {
        match name {
            Some(name) => {
                match snapshot.find(address, name) {
                    Some(existing) if existing.is_valid() => {}
                    Some(existing) => plan.upserts.push(NameRecord {
                        valid_to: None,
                        ..existing.clone()
                    }),
                    None => plan.upserts.push(NameRecord {
                        address: address.clone(),
                        name: name.to_string(),
                        valid_from: now,
                        valid_to: None,
                    }),
                }

                plan.invalidate_changed.extend(
                    snapshot
                        .valid(address)
                        .filter(|r| r.name != name)
                        .map(|r| invalidated(r, now)),
                );
            }
            None => {
                plan.invalidate_missing
                    .extend(snapshot.valid(address).map(|r| invalidated(r, now)));
            }
        }
    }

    plan
}

fn invalidated(record: &NameRecord, now: DateTime<Utc>) -> NameRecord {
    NameRecord {
        valid_to: Some(now),
        ..record.clone()
    }
}

/// Owns all writes to name records.
pub struct Reconciler {
    store: Arc<dyn NameStore>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn NameStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Reads the snapshot for the window, plans, and writes the plan.
    pub async fn reconcile(&self, outcomes: &[NameOutcome]) -> Result<NamePlan> {
        if outcomes.is_empty() {
            return Ok(NamePlan::default());
        }

        let addresses: Vec<Address> = outcomes.iter().map(|o| o.address.clone()).collect();
        let snapshot = NameSnapshot::new(self.store.name_records(&addresses).await?);
        let plan = plan(outcomes, &snapshot, self.clock.now());

        if plan.is_empty() {
            debug!(count = outcomes.len(), "Names unchanged");
            return Ok(plan);
        }

        self.store.write_names(&plan.invalidate_changed).await?;
        self.store.write_names(&plan.invalidate_missing).await?;
        self.store.write_names(&plan.upserts).await?;

        metrics().names_written.inc_by(plan.upserts.len() as u64);
        metrics().names_invalidated.inc_by(plan.invalidations() as u64);

        info!(
            addresses = outcomes.len(),
            upserts = plan.upserts.len(),
            changed = plan.invalidate_changed.len(),
            missing = plan.invalidate_missing.len(),
            "Reconciled names"
        );

        Ok(plan)
    }
}
