//! Social profile source: address → linked username → profile.

use super::opensea::UsernameLookup;
use super::twitter::{is_valid_username, DirectoryUser, ProfileDirectory};
use crate::resolver::EnrichmentSource;
use async_trait::async_trait;
use engine_core::{Address, EnrichmentResult, Source};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tracing::{error, info};

pub struct SocialSource {
    usernames: Arc<dyn UsernameLookup>,
    directory: Arc<dyn ProfileDirectory>,
    window_pause: Duration,
    max_execution_time: Duration,
}

impl SocialSource {
    pub fn new(
        usernames: Arc<dyn UsernameLookup>,
        directory: Arc<dyn ProfileDirectory>,
        window_pause: Duration,
        max_execution_time: Duration,
    ) -> Self {
        Self {
            usernames,
            directory,
            window_pause,
            max_execution_time,
        }
    }

    fn all_empty(addresses: &[Address]) -> Vec<EnrichmentResult> {
        addresses
            .iter()
            .map(|a| EnrichmentResult::empty(a.clone(), Source::Opensea))
            .collect()
    }
}

#[async_trait]
impl EnrichmentSource for SocialSource {
    fn source(&self) -> Source {
        Source::Opensea
    }

    fn max_execution_time(&self) -> Duration {
        self.max_execution_time
    }

    fn window_pause(&self) -> Duration {
        self.window_pause
    }

    async fn resolve_batch(&self, addresses: &[Address]) -> Vec<EnrichmentResult> {
        let linked = match self.usernames.usernames(addresses).await {
            Ok(linked) => linked,
            Err(e) => {
                metrics().resolver_errors.inc();
                error!(count = addresses.len(), "Username lookup failed: {}", e);
                return Self::all_empty(addresses);
            }
        };

        let (valid, invalid): (Vec<_>, Vec<_>) = linked
            .into_iter()
            .partition(|(_, username)| is_valid_username(username));

        if !invalid.is_empty() {
            metrics().usernames_rejected.inc_by(invalid.len() as u64);
            info!(count = invalid.len(), "Discarded malformed usernames");
        }

        if valid.is_empty() {
            return Self::all_empty(addresses);
        }

        let wanted: Vec<String> = valid
            .iter()
            .map(|(_, username)| username.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let users = match self.directory.users_by_username(&wanted).await {
            Ok(users) => users,
            Err(e) => {
                metrics().resolver_errors.inc();
                error!(count = wanted.len(), "Profile directory lookup failed: {}", e);
                return Self::all_empty(addresses);
            }
        };

        let by_username: HashMap<String, DirectoryUser> = users
            .into_iter()
            .map(|user| (user.username.to_ascii_lowercase(), user))
            .collect();

        let linked: HashMap<Address, String> = valid
            .into_iter()
            .map(|(address, username)| (address, username.to_ascii_lowercase()))
            .collect();

        let results: Vec<EnrichmentResult> = addresses
            .iter()
            .map(|address| {
                linked
                    .get(address)
                    .and_then(|username| by_username.get(username))
                    .map(|user| {
                        EnrichmentResult::Enriched(user.clone().into_fact(address.clone(), Source::Opensea))
                    })
                    .unwrap_or_else(|| EnrichmentResult::empty(address.clone(), Source::Opensea))
            })
            .collect();

        info!(
            accounts = addresses.len(),
            usernames = wanted.len(),
            profiles = by_username.len(),
            "Resolved social profiles"
        );

        results
    }
}
