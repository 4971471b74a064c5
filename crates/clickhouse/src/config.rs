//! ClickHouse configuration.

use serde::{Deserialize, Serialize};

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
    /// Persist consumer offsets here instead of in process memory
    #[serde(default = "default_persist_offsets")]
    pub persist_offsets: bool,
    /// Interval between internal metrics snapshots
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_database() -> String {
    "enrichment".to_string()
}

fn default_persist_offsets() -> bool {
    true
}

fn default_metrics_interval_secs() -> u64 {
    60
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: default_database(),
            username: None,
            password: None,
            persist_offsets: default_persist_offsets(),
            metrics_interval_secs: default_metrics_interval_secs(),
        }
    }
}
