//! Redpanda configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Redpanda connection and topic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpandaConfig {
    /// Broker addresses
    pub brokers: Vec<String>,
    /// SASL/SCRAM-SHA-256 username; enables TLS when set together with the password
    #[serde(default)]
    pub sasl_username: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
    #[serde(default)]
    pub topics: TopicsConfig,
    /// Upper bound on bytes returned by one fetch
    #[serde(default = "default_max_fetch_bytes")]
    pub max_fetch_bytes: i32,
    /// How long the broker may hold a fetch open waiting for data
    #[serde(default = "default_fetch_wait_ms")]
    pub fetch_wait_ms: u64,
    /// Addresses per produce request
    #[serde(default = "default_produce_chunk_size")]
    pub produce_chunk_size: usize,
    /// Compression type (none, gzip, snappy, lz4, zstd)
    #[serde(default = "default_compression")]
    pub compression: String,
}

/// Topic names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicsConfig {
    /// Low-priority address stream
    #[serde(default = "default_primary_topic")]
    pub primary: String,
    /// Addresses that jump the queue; unset disables priority admission
    #[serde(default = "default_high_priority_topic")]
    pub high_priority: Option<String>,
    /// Addresses for ENS name resolution
    #[serde(default = "default_names_topic")]
    pub names: String,
}

fn default_max_fetch_bytes() -> i32 {
    500_000
}

fn default_fetch_wait_ms() -> u64 {
    500
}

fn default_produce_chunk_size() -> usize {
    500
}

fn default_compression() -> String {
    "lz4".to_string()
}

fn default_primary_topic() -> String {
    "wallets".to_string()
}

fn default_high_priority_topic() -> Option<String> {
    Some("wallets_high_priority".to_string())
}

fn default_names_topic() -> String {
    "wallets_ens".to_string()
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_topic(),
            high_priority: default_high_priority_topic(),
            names: default_names_topic(),
        }
    }
}

impl Default for RedpandaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            sasl_username: None,
            sasl_password: None,
            topics: TopicsConfig::default(),
            max_fetch_bytes: default_max_fetch_bytes(),
            fetch_wait_ms: default_fetch_wait_ms(),
            produce_chunk_size: default_produce_chunk_size(),
            compression: default_compression(),
        }
    }
}

impl RedpandaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    /// SASL credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.sasl_username, &self.sasl_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

/// One consumption group: a low-priority topic, an optional
/// high-priority topic, and its liveness budget.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    pub group_id: String,
    pub primary_topic: String,
    pub high_priority_topic: Option<String>,
    /// A session with no heartbeat for this long is considered dead.
    /// Must cover one full window of processing.
    pub session_timeout: Duration,
    pub max_fetch_bytes: i32,
    pub fetch_wait: Duration,
}

impl GroupConfig {
    pub fn new(group_id: impl Into<String>, primary_topic: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            primary_topic: primary_topic.into(),
            high_priority_topic: None,
            session_timeout: Duration::from_secs(30),
            max_fetch_bytes: default_max_fetch_bytes(),
            fetch_wait: Duration::from_millis(default_fetch_wait_ms()),
        }
    }

    pub fn with_high_priority(mut self, topic: Option<String>) -> Self {
        self.high_priority_topic = topic;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_fetch(mut self, max_bytes: i32, wait: Duration) -> Self {
        self.max_fetch_bytes = max_bytes;
        self.fetch_wait = wait;
        self
    }

    /// All subscribed topics, primary first.
    pub fn topics(&self) -> Vec<String> {
        let mut topics = vec![self.primary_topic.clone()];
        topics.extend(self.high_priority_topic.iter().cloned());
        topics
    }
}
