//! ENS names with forward verification.
//!
//! A reverse record is only trusted when resolving the name forward
//! returns the same address. Anyone can set a reverse record pointing at
//! any name, so an unverified reverse record is treated as no name.

use super::{endpoint, fetch_json};
use crate::resolver::{bounded, EnrichmentSource};
use async_trait::async_trait;
use engine_core::{Address, EnrichmentResult, ProfileFact, Result, Source};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tracing::{debug, warn};

const SERVICE: &str = "ens";

/// Reverse and forward name resolution.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Primary name claimed by `address`.
    async fn reverse(&self, address: &Address) -> Result<Option<String>>;

    /// Address `name` currently points at.
    async fn forward(&self, name: &str) -> Result<Option<String>>;
}

/// Resolves the verified primary name of `address`.
///
/// Both calls run in sequence inside the caller's concurrency slot.
pub async fn verified_name(resolver: &dyn NameResolver, address: &Address) -> Result<Option<String>> {
    let Some(name) = resolver.reverse(address).await? else {
        return Ok(None);
    };

    if !is_plain_name(&name) {
        metrics().name_verifications_failed.inc();
        debug!(address = %address, name = %name, "Reverse record is not a plain name");
        return Ok(None);
    }

    match resolver.forward(&name).await? {
        Some(forward) if address.matches(&forward) => Ok(Some(name)),
        other => {
            metrics().name_verifications_failed.inc();
            debug!(
                address = %address,
                name = %name,
                forward = ?other,
                "Reverse record failed forward verification"
            );
            Ok(None)
        }
    }
}

/// Dot-separated labels with no path, query or escape characters.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|label| !label.is_empty())
        && !name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    ens: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForwardResponse {
    address: Option<String>,
}

/// HTTP name lookup service (`GET /{address}`, `GET /{name}`).
pub struct HttpNameResolver {
    http: Client,
    base_url: String,
}

impl HttpNameResolver {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl NameResolver for HttpNameResolver {
    async fn reverse(&self, address: &Address) -> Result<Option<String>> {
        let request = self.http.get(endpoint(&self.base_url, &[address.as_str()])?);
        let response = fetch_json::<ReverseResponse>(request, SERVICE).await?;
        Ok(response.and_then(|r| r.ens).filter(|name| !name.is_empty()))
    }

    async fn forward(&self, name: &str) -> Result<Option<String>> {
        let request = self.http.get(endpoint(&self.base_url, &[name])?);
        let response = fetch_json::<ForwardResponse>(request, SERVICE).await?;
        Ok(response.and_then(|r| r.address))
    }
}

/// ENS name source: one verified lookup per address, bounded concurrency.
pub struct EnsSource {
    resolver: Arc<dyn NameResolver>,
    concurrency: usize,
    max_execution_time: Duration,
}

impl EnsSource {
    pub fn new(resolver: Arc<dyn NameResolver>, concurrency: usize, max_execution_time: Duration) -> Self {
        Self {
            resolver,
            concurrency,
            max_execution_time,
        }
    }
}

#[async_trait]
impl EnrichmentSource for EnsSource {
    fn source(&self) -> Source {
        Source::Ens
    }

    fn max_execution_time(&self) -> Duration {
        self.max_execution_time
    }

    async fn resolve_batch(&self, addresses: &[Address]) -> Vec<EnrichmentResult> {
        let resolver = self.resolver.as_ref();
        let settled = bounded(addresses, self.concurrency, |address| async move {
            (address, verified_name(resolver, address).await)
        })
        .await;

        let mut failed = 0usize;
        let results: Vec<EnrichmentResult> = settled
            .into_iter()
            .map(|(address, outcome)| match outcome {
                Ok(Some(name)) => EnrichmentResult::Enriched(ProfileFact::ens_name(address.clone(), name)),
                Ok(None) => EnrichmentResult::empty(address.clone(), Source::Ens),
                Err(e) => {
                    failed += 1;
                    debug!(address = %address, "Name lookup failed: {}", e);
                    EnrichmentResult::empty(address.clone(), Source::Ens)
                }
            })
            .collect();

        if failed > 0 {
            metrics().resolver_errors.inc_by(failed as u64);
            warn!(failed = failed, requested = addresses.len(), "Name lookups failed");
        }

        results
    }
}
