//! Address producer using rskafka.

use crate::config::RedpandaConfig;
use crate::connection::{connect, topic_partitions};
use crate::topics::TopicRole;
use async_trait::async_trait;
use chrono::Utc;
use engine_core::error::BrokerErrorCode;
use engine_core::{Address, Error, Result};
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::client::Client;
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error};

/// Result of publishing addresses.
#[derive(Debug, Default)]
pub struct PublishResult {
    pub published: usize,
    pub errors: Vec<String>,
}

/// Publishes addresses onto one of the enrichment topics.
#[async_trait]
pub trait AddressPublisher: Send + Sync {
    async fn publish(&self, role: TopicRole, addresses: &[Address]) -> Result<PublishResult>;
}

/// Producer that writes each address as a JSON string record.
pub struct AddressProducer {
    config: RedpandaConfig,
    client: OnceCell<Client>,
    /// Partition clients per topic, in partition order
    partitions: RwLock<BTreeMap<String, Vec<Arc<PartitionClient>>>>,
    next_partition: AtomicUsize,
}

impl AddressProducer {
    pub fn new(config: RedpandaConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
            partitions: RwLock::new(BTreeMap::new()),
            next_partition: AtomicUsize::new(0),
        }
    }

    fn compression(&self) -> Compression {
        match self.config.compression.as_str() {
            "gzip" => Compression::Gzip,
            "snappy" => Compression::Snappy,
            "lz4" => Compression::Lz4,
            "zstd" => Compression::Zstd,
            _ => Compression::NoCompression,
        }
    }

    async fn partition_clients(&self, topic: &str) -> Result<Vec<Arc<PartitionClient>>> {
        {
            let partitions = self.partitions.read().await;
            if let Some(clients) = partitions.get(topic) {
                return Ok(clients.clone());
            }
        }

        let client = self
            .client
            .get_or_try_init(|| connect(&self.config))
            .await?;

        let metadata = client.list_topics().await.map_err(|e| {
            Error::broker(BrokerErrorCode::Connect, format!("Failed to list topics: {}", e))
        })?;
        let ids = topic_partitions(&metadata, topic)?;

        let mut clients = Vec::with_capacity(ids.len());
        for partition in ids {
            let partition_client = client
                .partition_client(topic.to_string(), partition, UnknownTopicHandling::Error)
                .await
                .map_err(|e| {
                    Error::broker(
                        BrokerErrorCode::Connect,
                        format!("Failed to get partition client: {}", e),
                    )
                })?;
            clients.push(Arc::new(partition_client));
        }

        self.partitions
            .write()
            .await
            .insert(topic.to_string(), clients.clone());
        Ok(clients)
    }
}

/// Serializes one address the way consumers expect it: a JSON string.
pub fn address_record(address: &Address) -> Result<Record> {
    Ok(Record {
        key: Some(address.as_str().as_bytes().to_vec()),
        value: Some(serde_json::to_vec(address.as_str())?),
        headers: BTreeMap::new(),
        timestamp: Utc::now(),
    })
}

#[async_trait]
impl AddressPublisher for AddressProducer {
    async fn publish(&self, role: TopicRole, addresses: &[Address]) -> Result<PublishResult> {
        let topic = role.topic(&self.config.topics).ok_or_else(|| {
            Error::config(format!("No topic configured for role {}", role))
        })?;

        if addresses.is_empty() {
            return Ok(PublishResult::default());
        }

        let clients = self.partition_clients(topic).await?;
        if clients.is_empty() {
            return Err(Error::broker(
                BrokerErrorCode::Connect,
                format!("Topic {} has no partitions", topic),
            ));
        }

        let start = std::time::Instant::now();
        let mut result = PublishResult::default();

        for chunk in addresses.chunks(self.config.produce_chunk_size.max(1)) {
            let records = chunk.iter().map(address_record).collect::<Result<Vec<_>>>()?;
            let idx = self.next_partition.fetch_add(1, Ordering::Relaxed) % clients.len();

            match clients[idx].produce(records, self.compression()).await {
                Ok(_offsets) => {
                    result.published += chunk.len();
                    metrics().addresses_published.inc_by(chunk.len() as u64);
                }
                Err(e) => {
                    error!(topic = %topic, count = chunk.len(), "Failed to publish addresses: {}", e);
                    metrics().publish_errors.inc_by(chunk.len() as u64);
                    result.errors.push(format!("Failed to produce: {}", e));
                }
            }
        }

        debug!(
            topic = %topic,
            count = result.published,
            latency_ms = %start.elapsed().as_millis(),
            "Published addresses to Redpanda"
        );

        Ok(result)
    }
}
