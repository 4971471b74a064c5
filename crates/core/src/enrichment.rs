//! Enrichment sources and their results.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Enrichment source an address is resolved against.
///
/// Also used as the cache partition key, so the string form is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Social profile linked through the OpenSea account page.
    Opensea,
    /// Primary ENS name (reverse record, forward verified).
    Ens,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opensea => "opensea",
            Self::Ens => "ens",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fact found for an address by an external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileFact {
    pub address: Address,
    pub source: Source,
    pub external_id: String,
    pub url: String,
    pub name: String,
    pub avatar_url: String,
    pub handle: String,
    pub follower_count: u64,
    pub location: String,
    pub bio: String,
}

impl ProfileFact {
    /// Builds the fact recorded for a verified ENS name.
    ///
    /// The name doubles as the external id and handle.
    pub fn ens_name(address: Address, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            address,
            source: Source::Ens,
            external_id: name.clone(),
            url: format!("https://app.ens.domains/{name}"),
            name: name.clone(),
            avatar_url: String::new(),
            handle: name,
            follower_count: 0,
            location: String::new(),
            bio: String::new(),
        }
    }
}

/// Outcome of resolving one address against one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EnrichmentResult {
    /// Nothing found, or the lookup failed. Still cached.
    Empty { address: Address, source: Source },
    Enriched(ProfileFact),
}

impl EnrichmentResult {
    pub fn empty(address: Address, source: Source) -> Self {
        Self::Empty { address, source }
    }

    pub fn address(&self) -> &Address {
        match self {
            Self::Empty { address, .. } => address,
            Self::Enriched(fact) => &fact.address,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            Self::Empty { source, .. } => *source,
            Self::Enriched(fact) => fact.source,
        }
    }

    pub fn fact(&self) -> Option<&ProfileFact> {
        match self {
            Self::Enriched(fact) => Some(fact),
            Self::Empty { .. } => None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched(_))
    }
}

/// Collects the facts out of a result set.
pub fn enriched_facts(results: &[EnrichmentResult]) -> Vec<ProfileFact> {
    results.iter().filter_map(|r| r.fact().cloned()).collect()
}
