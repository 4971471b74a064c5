//! Enrichment source and pipeline configuration.

use engine_core::{Error, Result, DEFAULT_CACHE_TTL_DAYS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time a window needs after its lookups to persist and ping.
pub const PERSIST_MARGIN_SECS: u64 = 10;

/// How the social source discovers usernames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialMode {
    /// One batched request to the scraper per window
    Scraper,
    /// One profile API request per address
    ProfileApi,
}

/// External services and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_social_mode")]
    pub social_mode: SocialMode,
    /// Scraper service base URL (`/scrape/list`)
    #[serde(default = "default_scraper_url")]
    pub scraper_url: String,
    /// OpenSea profile API base URL (`/user/{address}`)
    #[serde(default = "default_profile_api_url")]
    pub profile_api_url: String,
    /// Twitter API base URL (`/2/users/by`)
    #[serde(default = "default_directory_url")]
    pub directory_url: String,
    /// Bearer token for the Twitter API
    #[serde(default)]
    pub directory_token: String,
    /// ENS lookup service base URL (`/{address}`, `/{name}`)
    #[serde(default = "default_names_url")]
    pub names_url: String,
    /// In-flight external calls per window
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout for the batched scraper request
    #[serde(default = "default_scraper_timeout_secs")]
    pub scraper_timeout_secs: u64,
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: i64,
    /// Addresses per window
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Pause between social windows
    #[serde(default = "default_window_pause_ms")]
    pub window_pause_ms: u64,
    /// Session timeout of the social group
    #[serde(default = "default_social_session_timeout_secs")]
    pub social_session_timeout_secs: u64,
    /// Session timeout of the names group
    #[serde(default = "default_names_session_timeout_secs")]
    pub names_session_timeout_secs: u64,
    /// Delay before a failed consumer group is started again
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
}

fn default_social_mode() -> SocialMode {
    SocialMode::Scraper
}

fn default_scraper_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_profile_api_url() -> String {
    "https://api.opensea.io".to_string()
}

fn default_directory_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_names_url() -> String {
    "https://api.ensdata.net".to_string()
}

fn default_concurrency() -> usize {
    50
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_scraper_timeout_secs() -> u64 {
    300
}

fn default_cache_ttl_days() -> i64 {
    DEFAULT_CACHE_TTL_DAYS
}

fn default_window_size() -> usize {
    50
}

fn default_window_pause_ms() -> u64 {
    2000
}

fn default_social_session_timeout_secs() -> u64 {
    360
}

fn default_names_session_timeout_secs() -> u64 {
    30
}

fn default_restart_delay_secs() -> u64 {
    5
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            social_mode: default_social_mode(),
            scraper_url: default_scraper_url(),
            profile_api_url: default_profile_api_url(),
            directory_url: default_directory_url(),
            directory_token: String::new(),
            names_url: default_names_url(),
            concurrency: default_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            scraper_timeout_secs: default_scraper_timeout_secs(),
            cache_ttl_days: default_cache_ttl_days(),
            window_size: default_window_size(),
            window_pause_ms: default_window_pause_ms(),
            social_session_timeout_secs: default_social_session_timeout_secs(),
            names_session_timeout_secs: default_names_session_timeout_secs(),
            restart_delay_secs: default_restart_delay_secs(),
        }
    }
}

impl SourcesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scraper_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper_timeout_secs)
    }

    pub fn window_pause(&self) -> Duration {
        Duration::from_millis(self.window_pause_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    /// Rounds of concurrent calls needed for one window.
    fn rounds(&self) -> u64 {
        self.window_size.div_ceil(self.concurrency.max(1)) as u64
    }

    /// Worst case for one social window: username lookup, directory
    /// request, then persistence.
    pub fn social_window_budget_secs(&self) -> u64 {
        let usernames = match self.social_mode {
            SocialMode::Scraper => self.scraper_timeout_secs,
            SocialMode::ProfileApi => self.request_timeout_secs * self.rounds(),
        };
        usernames + self.request_timeout_secs + PERSIST_MARGIN_SECS
    }

    /// Worst case for one names window: reverse then forward per address.
    pub fn names_window_budget_secs(&self) -> u64 {
        2 * self.request_timeout_secs * self.rounds() + PERSIST_MARGIN_SECS
    }

    /// A window that finishes inside its timeouts must also finish inside
    /// its group's session, or a successful window aborts the batch.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || self.concurrency == 0 {
            return Err(Error::config("window_size and concurrency must be positive"));
        }

        let social = self.social_window_budget_secs();
        if self.social_session_timeout_secs < social {
            return Err(Error::config(format!(
                "social_session_timeout_secs ({}) must be at least {} for {:?} mode",
                self.social_session_timeout_secs, social, self.social_mode
            )));
        }

        let names = self.names_window_budget_secs();
        if self.names_session_timeout_secs < names {
            return Err(Error::config(format!(
                "names_session_timeout_secs ({}) must be at least {}",
                self.names_session_timeout_secs, names
            )));
        }

        Ok(())
    }
}
