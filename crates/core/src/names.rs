//! Name records with validity intervals.

use crate::address::Address;
use crate::enrichment::{EnrichmentResult, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One `(address, name)` association and the interval it was valid for.
///
/// `valid_to == None` means the association is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    pub address: Address,
    pub name: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl NameRecord {
    pub fn is_valid(&self) -> bool {
        self.valid_to.is_none()
    }
}

/// The verified name an address resolved to in this pass, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameOutcome {
    pub address: Address,
    pub name: Option<String>,
}

impl NameOutcome {
    pub fn named(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: Some(name.into()),
        }
    }

    pub fn unnamed(address: Address) -> Self {
        Self { address, name: None }
    }
}

impl From<&EnrichmentResult> for NameOutcome {
    fn from(result: &EnrichmentResult) -> Self {
        match result {
            EnrichmentResult::Enriched(fact) if fact.source == Source::Ens => {
                Self::named(fact.address.clone(), fact.external_id.clone())
            }
            other => Self::unnamed(other.address().clone()),
        }
    }
}
