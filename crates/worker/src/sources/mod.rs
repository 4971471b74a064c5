//! External lookup services.

pub mod ens;
pub mod opensea;
pub mod social;
pub mod twitter;

pub use ens::{EnsSource, HttpNameResolver, NameResolver};
pub use opensea::{OpenseaProfiles, OpenseaScraper, UsernameLookup};
pub use social::SocialSource;
pub use twitter::{DirectoryUser, ProfileDirectory, TwitterDirectory};

use engine_core::error::UpstreamErrorCode;
use engine_core::{Error, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with a request timeout.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))
}

/// Validates a configured base URL and strips trailing slashes.
pub fn base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| Error::config(format!("Invalid URL {}: {}", raw, e)))?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Joins path segments onto a base URL.
///
/// Each segment is percent-encoded, so a `/` or `..` inside one cannot
/// reach another path.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).map_err(|e| Error::config(format!("Invalid URL {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| Error::config(format!("URL cannot take a path: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Sends a request and decodes a JSON body.
///
/// `404 Not Found` is `Ok(None)`; other non-success statuses are errors.
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    service: &'static str,
) -> Result<Option<T>> {
    let response = request
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| Error::upstream(UpstreamErrorCode::RequestFailed, service, e.to_string()))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::upstream(
            UpstreamErrorCode::RequestFailed,
            service,
            format!("{}: {}", status, body.chars().take(200).collect::<String>()),
        ));
    }

    response
        .json::<T>()
        .await
        .map(Some)
        .map_err(|e| Error::upstream(UpstreamErrorCode::InvalidResponse, service, e.to_string()))
}
