//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use engine_core::error::DbErrorCode;
use engine_core::{Error, Result};
use tracing::info;

/// ClickHouse client wrapper.
///
/// Cheap to clone; clones share the underlying HTTP connection pool.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}

pub(crate) fn write_error(context: &str, e: clickhouse::error::Error) -> Error {
    Error::database(DbErrorCode::WriteFailed, format!("{}: {}", context, e))
}

pub(crate) fn read_error(context: &str, e: clickhouse::error::Error) -> Error {
    Error::database(DbErrorCode::ReadFailed, format!("{}: {}", context, e))
}
