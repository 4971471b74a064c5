//! Client construction shared by the consumer, producer, and health checks.

use crate::config::RedpandaConfig;
use engine_core::error::BrokerErrorCode;
use engine_core::{Error, Result};
use rskafka::client::{Client, ClientBuilder, Credentials, SaslConfig};
use rskafka::topic::Topic;
use std::sync::Arc;

/// Creates a TLS configuration for Redpanda Cloud.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Connects to the configured brokers.
///
/// TLS and SCRAM-SHA-256 are enabled only when credentials are configured,
/// so local brokers work in plaintext.
pub async fn connect(config: &RedpandaConfig) -> Result<Client> {
    let mut builder = ClientBuilder::new(vec![config.broker_string()]);

    if let Some((username, password)) = config.credentials() {
        builder = builder
            .tls_config(create_tls_config())
            .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                username.to_string(),
                password.to_string(),
            )));
    }

    builder.build().await.map_err(|e| {
        Error::broker(
            BrokerErrorCode::Connect,
            format!("Failed to connect to Redpanda: {}", e),
        )
    })
}

/// Partition ids of `topic` in ascending order.
pub fn topic_partitions(metadata: &[Topic], topic: &str) -> Result<Vec<i32>> {
    metadata
        .iter()
        .find(|t| t.name == topic)
        .map(|t| t.partitions.iter().copied().collect())
        .ok_or_else(|| Error::broker(BrokerErrorCode::Connect, format!("Unknown topic: {}", topic)))
}
