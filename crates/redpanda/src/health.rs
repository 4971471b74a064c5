//! Redpanda health checks.

use crate::config::RedpandaConfig;
use crate::connection::connect;
use std::collections::HashSet;
use tracing::{debug, error};

/// Check Redpanda connection health.
pub async fn check_connection(config: &RedpandaConfig) -> bool {
    let client = match connect(config).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to Redpanda: {}", e);
            return false;
        }
    };

    match client.list_topics().await {
        Ok(topics) => {
            debug!(topics = topics.len(), "Redpanda connection healthy");
            true
        }
        Err(e) => {
            error!("Failed to list Redpanda topics: {}", e);
            false
        }
    }
}

/// Returns the configured topics that do not exist on the cluster.
pub async fn missing_topics(config: &RedpandaConfig) -> Vec<String> {
    let wanted = config.topics.all();
    let all_missing = || wanted.iter().map(|t| t.to_string()).collect();

    let Ok(client) = connect(config).await else {
        return all_missing();
    };
    let Ok(existing) = client.list_topics().await else {
        return all_missing();
    };

    let existing: HashSet<_> = existing.iter().map(|t| t.name.as_str()).collect();
    wanted
        .iter()
        .filter(|t| !existing.contains(*t))
        .map(|t| t.to_string())
        .collect()
}
