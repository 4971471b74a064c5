//! Assembles sources, stores and processors from configuration.

use crate::batch::BatchProcessor;
use crate::cache_gate::CacheGate;
use crate::config::{SocialMode, SourcesConfig};
use crate::reconcile::Reconciler;
use crate::resolver::{BoundedResolver, EnrichmentSource};
use crate::sink::{FactSink, NameSink, WindowSink};
use crate::sources::{
    base_url, http_client, EnsSource, HttpNameResolver, OpenseaProfiles, OpenseaScraper,
    SocialSource, TwitterDirectory, UsernameLookup,
};
use clickhouse_client::{CacheStore, ClickHouseClient, FactStore, NameStore};
use engine_core::{CachePolicy, Clock, Result};
use redpanda::{GroupConfig, RedpandaConfig};
use std::sync::Arc;
use std::time::Duration;

/// Consumer group of the social pipeline.
pub const SOCIAL_GROUP_ID: &str = "opensea";
/// Consumer group of the name pipeline.
pub const NAMES_GROUP_ID: &str = "ens-resolver";

/// Storage handles shared by every pipeline.
#[derive(Clone)]
pub struct Stores {
    pub cache: Arc<dyn CacheStore>,
    pub facts: Arc<dyn FactStore>,
    pub names: Arc<dyn NameStore>,
}

impl Stores {
    pub fn clickhouse(client: Arc<ClickHouseClient>) -> Self {
        Self {
            cache: client.clone(),
            facts: client.clone(),
            names: client,
        }
    }
}

/// Social source for the configured username discovery mode.
pub fn social_source(config: &SourcesConfig) -> Result<SocialSource> {
    let http = http_client(config.request_timeout())?;

    let usernames: Arc<dyn UsernameLookup> = match config.social_mode {
        SocialMode::Scraper => Arc::new(OpenseaScraper::new(
            http.clone(),
            base_url(&config.scraper_url)?,
            config.scraper_timeout(),
        )),
        SocialMode::ProfileApi => Arc::new(OpenseaProfiles::new(
            http.clone(),
            base_url(&config.profile_api_url)?,
            config.concurrency,
        )),
    };

    let directory = TwitterDirectory::new(
        http,
        base_url(&config.directory_url)?,
        config.directory_token.clone(),
    );

    Ok(SocialSource::new(
        usernames,
        Arc::new(directory),
        config.window_pause(),
        Duration::from_secs(config.social_session_timeout_secs),
    ))
}

/// ENS source backed by the HTTP name service.
pub fn names_source(config: &SourcesConfig) -> Result<EnsSource> {
    let http = http_client(config.request_timeout())?;
    let resolver = HttpNameResolver::new(http, base_url(&config.names_url)?);

    Ok(EnsSource::new(
        Arc::new(resolver),
        config.concurrency,
        Duration::from_secs(config.names_session_timeout_secs),
    ))
}

/// Batch processor that writes facts.
pub fn fact_processor(
    source: Arc<dyn EnrichmentSource>,
    stores: &Stores,
    clock: Arc<dyn Clock>,
    config: &SourcesConfig,
) -> BatchProcessor {
    let sink: Arc<dyn WindowSink> = Arc::new(FactSink::new(stores.facts.clone()));
    processor(source, sink, stores, clock, config)
}

/// Batch processor that reconciles name records.
pub fn name_processor(
    source: Arc<dyn EnrichmentSource>,
    stores: &Stores,
    clock: Arc<dyn Clock>,
    config: &SourcesConfig,
) -> BatchProcessor {
    let reconciler = Reconciler::new(stores.names.clone(), clock.clone());
    let sink: Arc<dyn WindowSink> = Arc::new(NameSink::new(reconciler));
    processor(source, sink, stores, clock, config)
}

/// Group reading the primary and high-priority topics.
pub fn social_group(redpanda: &RedpandaConfig, source: &dyn EnrichmentSource) -> GroupConfig {
    GroupConfig::new(SOCIAL_GROUP_ID, redpanda.topics.primary.clone())
        .with_high_priority(redpanda.topics.high_priority.clone())
        .with_session_timeout(source.max_execution_time())
        .with_fetch(redpanda.max_fetch_bytes, Duration::from_millis(redpanda.fetch_wait_ms))
}

/// Group reading the names topic.
pub fn names_group(redpanda: &RedpandaConfig, source: &dyn EnrichmentSource) -> GroupConfig {
    GroupConfig::new(NAMES_GROUP_ID, redpanda.topics.names.clone())
        .with_session_timeout(source.max_execution_time())
        .with_fetch(redpanda.max_fetch_bytes, Duration::from_millis(redpanda.fetch_wait_ms))
}

fn processor(
    source: Arc<dyn EnrichmentSource>,
    sink: Arc<dyn WindowSink>,
    stores: &Stores,
    clock: Arc<dyn Clock>,
    config: &SourcesConfig,
) -> BatchProcessor {
    let gate = CacheGate::new(
        stores.cache.clone(),
        CachePolicy::from_days(config.cache_ttl_days),
        clock,
    );
    BatchProcessor::new(gate, BoundedResolver::new(source), sink).with_window_size(config.window_size)
}
