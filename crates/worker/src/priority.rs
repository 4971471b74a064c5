//! Two-priority consumption loop.
//!
//! One consumer group reads a primary topic and, optionally, a
//! high-priority topic. Whenever the high-priority topic has undelivered
//! messages the primary topic is paused, and it is resumed once that
//! backlog is gone. Admission is re-evaluated between batches only: a
//! batch already being processed is never interrupted.

use crate::batch::{BatchProcessor, BatchReport};
use engine_core::Result;
use redpanda::{Delivery, GroupConsumer};
use std::sync::Arc;
use telemetry::{health, metrics};
use tracing::{debug, error, info, warn};

/// Admission state after the last backlog check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityState {
    pub low_priority_paused: bool,
}

/// Drives a [`BatchProcessor`] from a consumer group.
pub struct PriorityConsumer {
    consumer: Arc<dyn GroupConsumer>,
    processor: BatchProcessor,
    primary_topic: String,
    high_priority_topic: Option<String>,
}

/// Marks the group as consuming for as long as it lives.
struct ConsumingGuard {
    group_id: String,
}

impl ConsumingGuard {
    fn start(group_id: &str) -> Self {
        health().group_started(group_id);
        Self {
            group_id: group_id.to_string(),
        }
    }
}

impl Drop for ConsumingGuard {
    fn drop(&mut self) {
        health().group_stopped(&self.group_id);
    }
}

impl PriorityConsumer {
    pub fn new(
        consumer: Arc<dyn GroupConsumer>,
        processor: BatchProcessor,
        primary_topic: impl Into<String>,
        high_priority_topic: Option<String>,
    ) -> Self {
        Self {
            consumer,
            processor,
            primary_topic: primary_topic.into(),
            high_priority_topic,
        }
    }

    pub fn group_id(&self) -> &str {
        self.consumer.group_id()
    }

    fn topics(&self) -> Vec<String> {
        let mut topics = vec![self.primary_topic.clone()];
        topics.extend(self.high_priority_topic.clone());
        topics
    }

    /// Subscribes and consumes until the broker connection fails.
    ///
    /// Never returns `Ok` on its own; an error means this group is no
    /// longer consuming and may be restarted.
    pub async fn run(&self) -> Result<()> {
        let topics = self.topics();

        if let Err(e) = self.consumer.subscribe(&topics).await {
            error!(group_id = %self.group_id(), topics = ?topics, "Cannot subscribe consumer: {}", e);
            return Err(e);
        }

        let _consuming = ConsumingGuard::start(self.group_id());
        info!(
            group_id = %self.group_id(),
            primary = %self.primary_topic,
            high_priority = ?self.high_priority_topic,
            "Consumer running"
        );

        // A backlog already waiting is served before the first primary fetch.
        self.reconcile_schedule().await;

        loop {
            let delivery = match self.consumer.next_batch().await {
                Ok(delivery) => delivery,
                Err(e) => {
                    error!(group_id = %self.group_id(), "Consumer fetch failed: {}", e);
                    return Err(e);
                }
            };

            match delivery {
                Some(delivery) => {
                    self.process(&delivery).await?;
                }
                None => {
                    self.reconcile_schedule().await;
                }
            }
        }
    }

    /// Handles one delivery: process, re-check admission, commit, re-check.
    pub async fn process(&self, delivery: &Delivery) -> Result<BatchReport> {
        metrics().batches_consumed.inc();

        let report = match self
            .processor
            .handle(delivery.payloads(), self.consumer.as_ref())
            .await
        {
            Ok(report) => report,
            Err(e) => {
                error!(
                    group_id = %self.group_id(),
                    topic = %delivery.topic,
                    partition = delivery.partition,
                    "Batch aborted: {}",
                    e
                );
                return Err(e);
            }
        };

        self.reconcile_schedule().await;

        match self.consumer.commit(delivery).await {
            Ok(()) => {
                info!(
                    group_id = %self.group_id(),
                    topic = %delivery.topic,
                    batch_size = delivery.len(),
                    offset_lag = delivery.offset_lag(),
                    "Batch processed"
                );
            }
            Err(e) if e.is_session_expired() => {
                warn!(
                    group_id = %self.group_id(),
                    topic = %delivery.topic,
                    "Commit rejected, batch will be redelivered: {}",
                    e
                );
            }
            Err(e) => {
                error!(group_id = %self.group_id(), topic = %delivery.topic, "Commit failed: {}", e);
            }
        }

        self.reconcile_schedule().await;
        Ok(report)
    }

    /// Pauses the primary topic while the high-priority topic has backlog,
    /// resumes it once the backlog is drained.
    ///
    /// Lag lookup failures are logged and retried on the next call.
    pub async fn reconcile_schedule(&self) -> PriorityState {
        let Some(high_priority) = self.high_priority_topic.as_deref() else {
            return self.state();
        };

        let lag = match self.consumer.lag(high_priority).await {
            Ok(lag) => lag,
            Err(e) => {
                warn!(group_id = %self.group_id(), topic = %high_priority, "Failed to read backlog: {}", e);
                return self.state();
            }
        };

        metrics().high_priority_lag.set(lag.max(0) as u64);
        let paused = self.consumer.is_paused(&self.primary_topic);

        if lag > 0 && !paused {
            info!(group_id = %self.group_id(), topic = %self.primary_topic, lag = lag, "Pausing low priority topic");
            self.consumer.pause(&self.primary_topic);
            metrics().low_priority_pauses.inc();
        } else if lag == 0 && paused {
            info!(group_id = %self.group_id(), topic = %self.primary_topic, "Resuming low priority topic");
            self.consumer.resume(&self.primary_topic);
            metrics().low_priority_resumes.inc();
        } else {
            debug!(group_id = %self.group_id(), lag = lag, paused = paused, "Admission unchanged");
        }

        let state = self.state();
        metrics()
            .low_priority_paused
            .set(u64::from(state.low_priority_paused));
        state
    }

    fn state(&self) -> PriorityState {
        PriorityState {
            low_priority_paused: self.consumer.is_paused(&self.primary_topic),
        }
    }
}
