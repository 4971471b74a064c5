//! ClickHouse health checks.

use crate::client::{write_error, ClickHouseClient};
use engine_core::Result;
use tracing::{debug, error};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Initialize database schema.
///
/// Creates the database and all tables if they don't exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    use crate::schema::all_tables;

    // The target database may not exist yet; DDL is fully qualified.
    let bootstrap = client.inner().clone().with_database("default");

    for ddl in all_tables() {
        bootstrap
            .query(ddl)
            .execute()
            .await
            .map_err(|e| write_error("Failed to execute DDL", e))?;
    }

    debug!("ClickHouse schema initialized");
    Ok(())
}
