//! Wallet Enrichment Engine
//!
//! Consumes wallet addresses from Redpanda and enriches them:
//! - Social profiles (OpenSea username discovery, Twitter directory)
//! - ENS names (reverse lookup with forward verification)
//! - Priority admission between the regular and high-priority topics
//! - Facts, name validity intervals and lookup cache in ClickHouse

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use clickhouse_client::{ClickHouseClient, ClickHouseConfig};
use engine_core::{Clock, SystemClock};
use redpanda::{AddressProducer, Consumer, MemoryOffsetStore, OffsetStore, RedpandaConfig};
use telemetry::{health, init_tracing_from_env};
use worker::pipeline::{self, Stores};
use worker::{EnrichmentSource, PriorityConsumer, SourcesConfig, WorkerConfig, WorkerScheduler};

/// HTTP server settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct AppConfig {
    #[serde(default)]
    server: ServerConfig,

    #[serde(default)]
    redpanda: RedpandaConfig,

    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    sources: SourcesConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23 needs a process-wide crypto provider before any TLS handshake
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Wallet Enrichment Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        brokers = ?config.redpanda.brokers,
        sasl_username = config.redpanda.sasl_username.as_deref().unwrap_or("none"),
        social_mode = ?config.sources.social_mode,
        "Loaded configuration"
    );

    let clickhouse = Arc::new(
        ClickHouseClient::new(config.clickhouse.clone())
            .context("Failed to create ClickHouse client")?,
    );

    if let Err(e) = clickhouse_client::health::init_schema(&clickhouse).await {
        // Tables may already exist under a user without DDL rights
        error!("Failed to initialize ClickHouse schema: {}", e);
    }

    check_health(&config, &clickhouse).await;

    let offsets: Arc<dyn OffsetStore> = if config.clickhouse.persist_offsets {
        clickhouse.clone()
    } else {
        warn!("Committed offsets are kept in memory and lost on restart");
        Arc::new(MemoryOffsetStore::new())
    };

    let stores = Stores::clickhouse(clickhouse.clone());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Social group: primary + high-priority topics
    let social: Arc<dyn EnrichmentSource> = Arc::new(
        pipeline::social_source(&config.sources).context("Failed to build social source")?,
    );
    let social_group = pipeline::social_group(&config.redpanda, social.as_ref());
    let social_consumer = PriorityConsumer::new(
        Arc::new(Consumer::new(social_group.clone(), config.redpanda.clone(), offsets.clone())),
        pipeline::fact_processor(social, &stores, clock.clone(), &config.sources),
        social_group.primary_topic,
        social_group.high_priority_topic,
    );

    // Names group: ENS topic only
    let names: Arc<dyn EnrichmentSource> = Arc::new(
        pipeline::names_source(&config.sources).context("Failed to build name source")?,
    );
    let names_group = pipeline::names_group(&config.redpanda, names.as_ref());
    let names_consumer = PriorityConsumer::new(
        Arc::new(Consumer::new(names_group.clone(), config.redpanda.clone(), offsets)),
        pipeline::name_processor(names, &stores, clock, &config.sources),
        names_group.primary_topic,
        None,
    );

    let scheduler = Arc::new(
        WorkerScheduler::new(WorkerConfig {
            restart_delay: config.sources.restart_delay(),
            metrics_flush_interval: Duration::from_secs(config.clickhouse.metrics_interval_secs),
        })
        .with_clickhouse(clickhouse.clone())
        .with_group(social_consumer)
        .with_group(names_consumer),
    );
    let _worker_handles = scheduler.start();

    let producer = Arc::new(AddressProducer::new(config.redpanda.clone()));
    let app = router(AppState::new(producer));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from defaults, `config/default.toml` and environment.
fn load_config() -> Result<AppConfig> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&AppConfig::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("ENRICHER")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Nested fields with underscores don't map reliably through the separator
    if let Ok(brokers) = std::env::var("ENRICHER_REDPANDA_BROKERS") {
        config.redpanda.brokers = brokers.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(username) = std::env::var("ENRICHER_REDPANDA_SASL_USERNAME") {
        config.redpanda.sasl_username = Some(username);
    }
    if let Ok(password) = std::env::var("ENRICHER_REDPANDA_SASL_PASSWORD") {
        config.redpanda.sasl_password = Some(password);
    }
    if let Ok(url) = std::env::var("ENRICHER_CLICKHOUSE_URL") {
        config.clickhouse.url = url;
    }
    if let Ok(username) = std::env::var("ENRICHER_CLICKHOUSE_USERNAME") {
        config.clickhouse.username = Some(username);
    }
    if let Ok(password) = std::env::var("ENRICHER_CLICKHOUSE_PASSWORD") {
        config.clickhouse.password = Some(password);
    }
    if let Ok(token) = std::env::var("ENRICHER_DIRECTORY_TOKEN") {
        config.sources.directory_token = token;
    }

    config.sources.validate().context("Invalid sources configuration")?;

    Ok(config)
}

/// Check component health on startup.
async fn check_health(config: &AppConfig, clickhouse: &ClickHouseClient) {
    if redpanda::health::check_connection(&config.redpanda).await {
        health().redpanda.set_healthy();
        info!("Redpanda connection: healthy");

        let missing = redpanda::health::missing_topics(&config.redpanda).await;
        if !missing.is_empty() {
            warn!(topics = ?missing, "Configured topics do not exist yet");
        }
    } else {
        health().redpanda.set_unhealthy("Connection failed");
        error!("Redpanda connection: unhealthy");
    }

    if clickhouse_client::health::check_connection(clickhouse).await {
        health().clickhouse.set_healthy();
        info!("ClickHouse connection: healthy");
    } else {
        health().clickhouse.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
