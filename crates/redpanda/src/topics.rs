//! Topic roles.

use crate::config::TopicsConfig;
use serde::{Deserialize, Serialize};

/// What a topic is consumed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicRole {
    /// Bulk addresses for social enrichment
    Primary,
    /// Social enrichment that preempts the primary stream
    HighPriority,
    /// ENS name resolution
    Names,
}

impl TopicRole {
    pub const ALL: [TopicRole; 3] = [TopicRole::Primary, TopicRole::HighPriority, TopicRole::Names];

    pub fn as_str(&self) -> &'static str {
        match self {
            TopicRole::Primary => "primary",
            TopicRole::HighPriority => "high_priority",
            TopicRole::Names => "names",
        }
    }

    /// Topic name for this role, if configured.
    pub fn topic<'a>(&self, topics: &'a TopicsConfig) -> Option<&'a str> {
        match self {
            TopicRole::Primary => Some(topics.primary.as_str()),
            TopicRole::HighPriority => topics.high_priority.as_deref(),
            TopicRole::Names => Some(topics.names.as_str()),
        }
    }
}

impl std::fmt::Display for TopicRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TopicsConfig {
    /// Every configured topic name, for startup verification.
    pub fn all(&self) -> Vec<&str> {
        TopicRole::ALL.iter().filter_map(|role| role.topic(self)).collect()
    }
}
