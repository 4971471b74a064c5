//! Worker scheduler: consumer groups and periodic tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};

use clickhouse_client::{insert_metrics, ClickHouseClient};
use telemetry::metrics;

use crate::priority::PriorityConsumer;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Delay before a failed consumer group is started again
    pub restart_delay: Duration,
    /// Metrics flush interval
    pub metrics_flush_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            restart_delay: Duration::from_secs(5),
            metrics_flush_interval: Duration::from_secs(60), // 1 minute
        }
    }
}

/// Runs every consumer group under supervision.
pub struct WorkerScheduler {
    config: WorkerConfig,
    clickhouse: Option<Arc<ClickHouseClient>>,
    groups: Vec<Arc<PriorityConsumer>>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            clickhouse: None,
            groups: Vec::new(),
        }
    }

    /// Flushes metrics snapshots to ClickHouse.
    pub fn with_clickhouse(mut self, clickhouse: Arc<ClickHouseClient>) -> Self {
        self.clickhouse = Some(clickhouse);
        self
    }

    pub fn with_group(mut self, group: PriorityConsumer) -> Self {
        self.groups.push(Arc::new(group));
        self
    }

    /// Starts all consumer groups and background tasks.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        for group in &self.groups {
            let group = group.clone();
            let restart_delay = self.config.restart_delay;
            info!(group_id = %group.group_id(), "Consumer group started");
            handles.push(tokio::spawn(async move {
                supervise(group, restart_delay).await;
            }));
        }

        if self.clickhouse.is_some() {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler.run_metrics_flush().await;
            }));
        }

        info!(groups = self.groups.len(), "Background workers started");
        handles
    }

    async fn run_metrics_flush(&self) {
        let Some(ref clickhouse) = self.clickhouse else {
            return;
        };

        let mut ticker = interval(self.config.metrics_flush_interval);

        loop {
            ticker.tick().await;

            let snapshot = metrics().snapshot();
            if let Err(e) = insert_metrics(clickhouse, snapshot).await {
                error!("Failed to flush metrics: {}", e);
            }
        }
    }
}

/// Runs a group forever, restarting it after `restart_delay` whenever it stops.
pub async fn supervise(group: Arc<PriorityConsumer>, restart_delay: Duration) {
    loop {
        match group.run().await {
            Ok(()) => warn!(group_id = %group.group_id(), "Consumer group stopped"),
            Err(e) => error!(group_id = %group.group_id(), "Consumer group failed: {}", e),
        }

        metrics().consumer_restarts.inc();
        tokio::time::sleep(restart_delay).await;
        info!(group_id = %group.group_id(), "Restarting consumer group");
    }
}
