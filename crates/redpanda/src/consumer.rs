//! Redpanda consumer groups.
//!
//! Uses rskafka partition clients with:
//! - One assignment per (topic, partition) of every subscribed topic
//! - Committed positions kept in an [`OffsetStore`], earliest offset on first run
//! - Per-topic pause/resume without disconnecting
//! - A session watchdog: progress is only committed while the session is alive

use crate::config::{GroupConfig, RedpandaConfig};
use crate::connection::{connect, topic_partitions};
use crate::offsets::{OffsetKey, OffsetStore};
use crate::session::SessionWatchdog;
use async_trait::async_trait;
use engine_core::error::BrokerErrorCode;
use engine_core::{Error, Result};
use parking_lot::RwLock;
use rskafka::client::partition::{OffsetAt, PartitionClient, UnknownTopicHandling};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One message of a delivered batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub offset: i64,
    pub value: Option<Vec<u8>>,
}

/// A batch of messages from one topic partition.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub topic: String,
    pub partition: i32,
    pub messages: Vec<Message>,
    /// Partition high watermark at fetch time.
    pub high_watermark: i64,
}

impl Delivery {
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        messages: Vec<Message>,
        high_watermark: i64,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            messages,
            high_watermark,
        }
    }

    /// Raw payloads in offset order.
    pub fn payloads(&self) -> impl Iterator<Item = Option<&[u8]>> {
        self.messages.iter().map(|m| m.value.as_deref())
    }

    /// Offset to commit once the batch is processed.
    pub fn next_offset(&self) -> Option<i64> {
        self.messages.last().map(|m| m.offset + 1)
    }

    /// Messages left in the partition behind this batch.
    pub fn offset_lag(&self) -> i64 {
        self.next_offset()
            .map(|next| (self.high_watermark - next).max(0))
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Extends the consumer session while a long batch is being processed.
#[async_trait]
pub trait Heartbeat: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

/// A consumer-group member.
///
/// Implemented by [`Consumer`] over rskafka and by in-memory mocks in tests.
#[async_trait]
pub trait GroupConsumer: Heartbeat {
    fn group_id(&self) -> &str;

    /// Connects and assigns every partition of `topics`.
    ///
    /// Partitions without a committed position start from the earliest
    /// retained offset.
    async fn subscribe(&self, topics: &[String]) -> Result<()>;

    /// Waits for the next batch from any unpaused topic.
    ///
    /// Returns `Ok(None)` when the fetch wait elapsed with nothing to deliver.
    async fn next_batch(&self) -> Result<Option<Delivery>>;

    /// Commits a processed batch.
    ///
    /// Fails with `BROKER_003` if the session expired since the last
    /// heartbeat; the consumer then rewinds to its committed positions.
    async fn commit(&self, delivery: &Delivery) -> Result<()>;

    fn pause(&self, topic: &str);
    fn resume(&self, topic: &str);
    fn is_paused(&self, topic: &str) -> bool;

    /// Messages in `topic` not yet delivered to this group.
    async fn lag(&self, topic: &str) -> Result<i64>;
}

struct Assignment {
    key: OffsetKey,
    client: Arc<PartitionClient>,
    /// Next offset to fetch
    position: i64,
    /// Next offset after the last committed batch
    committed: i64,
}

/// Consumer-group member backed by rskafka partition clients.
pub struct Consumer {
    group: GroupConfig,
    connection: RedpandaConfig,
    offsets: Arc<dyn OffsetStore>,
    assignments: Mutex<Vec<Assignment>>,
    cursor: AtomicUsize,
    paused: RwLock<HashSet<String>>,
    session: SessionWatchdog,
    member_id: String,
}

impl Consumer {
    /// Creates a new consumer. Nothing connects until [`GroupConsumer::subscribe`].
    pub fn new(group: GroupConfig, connection: RedpandaConfig, offsets: Arc<dyn OffsetStore>) -> Self {
        let member_id = format!("{}-{}", group.group_id, uuid::Uuid::new_v4());

        info!(
            group_id = %group.group_id,
            member_id = %member_id,
            topics = ?group.topics(),
            session_timeout_ms = group.session_timeout.as_millis() as u64,
            "Creating Redpanda consumer"
        );

        Self {
            session: SessionWatchdog::new(group.session_timeout),
            group,
            connection,
            offsets,
            assignments: Mutex::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            paused: RwLock::new(HashSet::new()),
            member_id,
        }
    }

    pub fn config(&self) -> &GroupConfig {
        &self.group
    }

    fn transport_error(context: &str, e: impl std::fmt::Display) -> Error {
        Error::broker(BrokerErrorCode::Transport, format!("{}: {}", context, e))
    }

    fn connect_error(context: &str, e: impl std::fmt::Display) -> Error {
        Error::broker(BrokerErrorCode::Connect, format!("{}: {}", context, e))
    }
}

#[async_trait]
impl Heartbeat for Consumer {
    async fn ping(&self) -> Result<()> {
        if self.session.is_expired() {
            return Err(Error::broker(
                BrokerErrorCode::SessionExpired,
                format!(
                    "session for {} expired after {:?} without heartbeat",
                    self.member_id,
                    self.session.timeout()
                ),
            ));
        }
        self.session.beat();
        metrics().heartbeats.inc();
        Ok(())
    }
}

#[async_trait]
impl GroupConsumer for Consumer {
    fn group_id(&self) -> &str {
        &self.group.group_id
    }

    async fn subscribe(&self, topics: &[String]) -> Result<()> {
        let client = connect(&self.connection).await?;
        let metadata = client
            .list_topics()
            .await
            .map_err(|e| Self::connect_error("Failed to list topics", e))?;

        let mut assignments = Vec::new();
        for topic in topics {
            for partition in topic_partitions(&metadata, topic)? {
                let partition_client = client
                    .partition_client(topic.clone(), partition, UnknownTopicHandling::Error)
                    .await
                    .map_err(|e| Self::connect_error("Failed to get partition client", e))?;

                let key = OffsetKey::new(&self.group.group_id, topic, partition);
                let start = match self.offsets.load(&key).await? {
                    Some(offset) => offset,
                    None => partition_client
                        .get_offset(OffsetAt::Earliest)
                        .await
                        .map_err(|e| Self::connect_error("Failed to get earliest offset", e))?,
                };

                info!(
                    group_id = %self.group.group_id,
                    topic = %topic,
                    partition = partition,
                    offset = start,
                    "Partition assigned"
                );

                assignments.push(Assignment {
                    key,
                    client: Arc::new(partition_client),
                    position: start,
                    committed: start,
                });
            }
        }

        *self.assignments.lock().await = assignments;
        self.paused.write().clear();
        self.session.beat();
        Ok(())
    }

    async fn next_batch(&self) -> Result<Option<Delivery>> {
        let mut assignments = self.assignments.lock().await;
        if assignments.is_empty() {
            return Err(Error::broker(
                BrokerErrorCode::Connect,
                format!("{} has no partition assignments", self.member_id),
            ));
        }

        let n = assignments.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        let next = {
            let paused = self.paused.read();
            (0..n)
                .map(|i| (start + i) % n)
                .find(|&i| !paused.contains(&assignments[i].key.topic))
        };

        let Some(idx) = next else {
            // Everything paused: wait out one fetch interval instead of spinning.
            drop(assignments);
            tokio::time::sleep(self.group.fetch_wait).await;
            self.session.beat();
            return Ok(None);
        };

        let assignment = &mut assignments[idx];
        let (records, high_watermark) = assignment
            .client
            .fetch_records(
                assignment.position,
                1..self.group.max_fetch_bytes,
                self.group.fetch_wait.as_millis() as i32,
            )
            .await
            .map_err(|e| Self::transport_error("Failed to fetch records", e))?;

        // Waiting on the fetch counts as liveness.
        self.session.beat();

        // Compressed record batches may start before the requested offset.
        let position = assignment.position;
        let messages: Vec<Message> = records
            .into_iter()
            .filter(|r| r.offset >= position)
            .map(|r| Message {
                offset: r.offset,
                value: r.record.value,
            })
            .collect();

        let Some(last) = messages.last().map(|m| m.offset) else {
            return Ok(None);
        };
        assignment.position = last + 1;

        debug!(
            group_id = %self.group.group_id,
            topic = %assignment.key.topic,
            partition = assignment.key.partition,
            count = messages.len(),
            offset_start = position,
            offset_end = last,
            high_watermark = high_watermark,
            "Fetched batch from Redpanda"
        );

        Ok(Some(Delivery::new(
            assignment.key.topic.clone(),
            assignment.key.partition,
            messages,
            high_watermark,
        )))
    }

    async fn commit(&self, delivery: &Delivery) -> Result<()> {
        let Some(next) = delivery.next_offset() else {
            return Ok(());
        };

        let mut assignments = self.assignments.lock().await;

        if self.session.is_expired() {
            metrics().session_expirations.inc();
            warn!(
                group_id = %self.group.group_id,
                topic = %delivery.topic,
                partition = delivery.partition,
                "Session expired before commit, rewinding to committed offsets"
            );
            for assignment in assignments.iter_mut() {
                assignment.position = assignment.committed;
            }
            self.session.beat();
            return Err(Error::broker(
                BrokerErrorCode::SessionExpired,
                format!("commit for {}:{} rejected", delivery.topic, delivery.partition),
            ));
        }

        let assignment = assignments
            .iter_mut()
            .find(|a| a.key.topic == delivery.topic && a.key.partition == delivery.partition)
            .ok_or_else(|| {
                Error::broker(
                    BrokerErrorCode::Transport,
                    format!("{}:{} is not assigned", delivery.topic, delivery.partition),
                )
            })?;

        self.offsets.save(&assignment.key, next).await?;
        let prev = std::mem::replace(&mut assignment.committed, next);
        self.session.beat();

        debug!(
            group_id = %self.group.group_id,
            topic = %delivery.topic,
            partition = delivery.partition,
            prev_offset = prev,
            new_offset = next,
            "Committed offset"
        );

        Ok(())
    }

    fn pause(&self, topic: &str) {
        if self.paused.write().insert(topic.to_string()) {
            info!(group_id = %self.group.group_id, topic = %topic, "Paused topic");
        }
    }

    fn resume(&self, topic: &str) {
        if self.paused.write().remove(topic) {
            info!(group_id = %self.group.group_id, topic = %topic, "Resumed topic");
        }
    }

    fn is_paused(&self, topic: &str) -> bool {
        self.paused.read().contains(topic)
    }

    async fn lag(&self, topic: &str) -> Result<i64> {
        let assignments = self.assignments.lock().await;
        let mut lag = 0;

        for assignment in assignments.iter().filter(|a| a.key.topic == topic) {
            let high_watermark = assignment
                .client
                .get_offset(OffsetAt::Latest)
                .await
                .map_err(|e| Self::transport_error("Failed to get latest offset", e))?;
            lag += (high_watermark - assignment.position).max(0);
        }

        Ok(lag)
    }
}
