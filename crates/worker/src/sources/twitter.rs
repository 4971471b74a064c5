//! Twitter profile directory.

use super::fetch_json;
use async_trait::async_trait;
use engine_core::{Address, ProfileFact, Result, Source};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;

const SERVICE: &str = "twitter";

/// Usernames per `/2/users/by` request.
const MAX_USERNAMES_PER_REQUEST: usize = 100;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,15}$").expect("username regex is valid"));

/// Whether `username` fits the platform's username grammar.
pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub followers_count: u64,
}

/// A user record from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public_metrics: PublicMetrics,
}

impl DirectoryUser {
    /// The fact recorded for `address` when it links to this user.
    pub fn into_fact(self, address: Address, source: Source) -> ProfileFact {
        ProfileFact {
            address,
            source,
            url: format!("https://twitter.com/{}", self.username),
            external_id: self.id,
            name: self.name,
            avatar_url: self.profile_image_url,
            handle: self.username,
            follower_count: self.public_metrics.followers_count,
            location: self.location.map(|l| l.trim().to_string()).unwrap_or_default(),
            bio: single_line(&self.description),
        }
    }
}

/// Trims and folds line breaks into spaces.
pub fn single_line(text: &str) -> String {
    text.trim().replace("\r\n", " ").replace(|c: char| c == '\n' || c == '\r', " ")
}

/// Looks up user profiles by username.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn users_by_username(&self, usernames: &[String]) -> Result<Vec<DirectoryUser>>;
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    data: Vec<DirectoryUser>,
}

/// Twitter API v2 client.
pub struct TwitterDirectory {
    http: Client,
    base_url: String,
    token: String,
}

impl TwitterDirectory {
    pub fn new(http: Client, base_url: String, token: String) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }
}

#[async_trait]
impl ProfileDirectory for TwitterDirectory {
    async fn users_by_username(&self, usernames: &[String]) -> Result<Vec<DirectoryUser>> {
        let mut users = Vec::new();

        for chunk in usernames.chunks(MAX_USERNAMES_PER_REQUEST) {
            let request = self
                .http
                .get(format!("{}/2/users/by", self.base_url))
                .bearer_auth(&self.token)
                .query(&[
                    ("usernames", chunk.join(",")),
                    (
                        "user.fields",
                        "location,profile_image_url,public_metrics,description".to_string(),
                    ),
                ]);

            // Unknown usernames are simply absent from `data`.
            if let Some(response) = fetch_json::<UsersResponse>(request, SERVICE).await? {
                users.extend(response.data);
            }
        }

        Ok(users)
    }
}
