//! Username discovery through OpenSea.

use super::{endpoint, fetch_json};
use crate::resolver::bounded;
use async_trait::async_trait;
use engine_core::error::UpstreamErrorCode;
use engine_core::{Address, Error, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;
use telemetry::metrics;
use tracing::{debug, warn};

const SERVICE: &str = "opensea";

/// Selects the script tag carrying the page state.
const PAGE_STATE_XPATH: &str = r#"//script[contains(text(), "window.__wired__")]"#;

static CONNECTED_USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"connectedTwitterUsername":"(.+?)""#).expect("username regex is valid")
});

/// Finds the username each address links to, if any.
#[async_trait]
pub trait UsernameLookup: Send + Sync {
    /// Addresses without a linked username are simply absent.
    async fn usernames(&self, addresses: &[Address]) -> Result<Vec<(Address, String)>>;
}

/// Profile page URL scraped for an address.
pub fn profile_url(address: &Address) -> String {
    format!("https://opensea.io/{}", address)
}

/// Extracts the linked username from a scraped profile page fragment.
pub fn parse_connected_username(payload: &str) -> Option<String> {
    CONNECTED_USERNAME_RE
        .captures(payload)
        .map(|caps| caps[1].to_string())
}

#[derive(Debug, Deserialize)]
struct ScrapeListResponse {
    data: Option<HashMap<String, String>>,
    #[serde(default)]
    errors: Option<HashMap<String, serde_json::Value>>,
}

/// Batched lookup through the scraper service: one request per window.
pub struct OpenseaScraper {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OpenseaScraper {
    pub fn new(http: Client, base_url: String, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl UsernameLookup for OpenseaScraper {
    async fn usernames(&self, addresses: &[Address]) -> Result<Vec<(Address, String)>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let by_url: HashMap<String, &Address> =
            addresses.iter().map(|a| (profile_url(a), a)).collect();

        let mut query: Vec<(&str, &str)> = by_url.keys().map(|url| ("url", url.as_str())).collect();
        query.push(("xpath", PAGE_STATE_XPATH));

        let request = self
            .http
            .get(format!("{}/scrape/list", self.base_url))
            .timeout(self.timeout)
            .query(&query);

        let response = fetch_json::<ScrapeListResponse>(request, SERVICE)
            .await?
            .ok_or_else(|| {
                Error::upstream(UpstreamErrorCode::RequestFailed, SERVICE, "scraper endpoint not found")
            })?;

        let data = response.data.ok_or_else(|| {
            Error::upstream(UpstreamErrorCode::InvalidResponse, SERVICE, "scrape response has no data")
        })?;

        let page_errors = response.errors.map(|e| e.len()).unwrap_or(0);
        if page_errors > 0 {
            metrics().resolver_errors.inc_by(page_errors as u64);
            warn!(errors = page_errors, requested = addresses.len(), "Scraper failed on some pages");
        }

        let found: Vec<(Address, String)> = data
            .iter()
            .filter_map(|(url, payload)| {
                let address = by_url.get(url)?;
                let username = parse_connected_username(payload)?;
                Some(((*address).clone(), username))
            })
            .collect();

        debug!(
            requested = addresses.len(),
            pages = data.len(),
            linked = found.len(),
            errors = page_errors,
            "Scraped OpenSea profiles"
        );

        Ok(found)
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    account: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    twitter_username: Option<String>,
}

/// Direct lookup through the profile API: one request per address.
pub struct OpenseaProfiles {
    http: Client,
    base_url: String,
    concurrency: usize,
}

impl OpenseaProfiles {
    pub fn new(http: Client, base_url: String, concurrency: usize) -> Self {
        Self {
            http,
            base_url,
            concurrency,
        }
    }

    async fn username(&self, address: &Address) -> Result<Option<String>> {
        let request = self.http.get(endpoint(&self.base_url, &["user", address.as_str()])?);
        let response = fetch_json::<UserResponse>(request, SERVICE).await?;

        Ok(response
            .and_then(|r| r.account)
            .and_then(|a| a.twitter_username)
            .filter(|u| !u.is_empty()))
    }
}

#[async_trait]
impl UsernameLookup for OpenseaProfiles {
    async fn usernames(&self, addresses: &[Address]) -> Result<Vec<(Address, String)>> {
        let settled = bounded(addresses, self.concurrency, |address| async move {
            (address, self.username(address).await)
        })
        .await;

        let mut found = Vec::new();
        let mut failed = 0usize;
        for (address, result) in settled {
            match result {
                Ok(Some(username)) => found.push((address.clone(), username)),
                Ok(None) => {}
                Err(e) => {
                    failed += 1;
                    debug!(address = %address, "Profile lookup failed: {}", e);
                }
            }
        }

        if failed > 0 {
            metrics().resolver_errors.inc_by(failed as u64);
            warn!(failed = failed, requested = addresses.len(), "Profile lookups failed");
        }

        Ok(found)
    }
}
