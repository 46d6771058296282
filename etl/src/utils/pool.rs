use std::time::Duration;

use common::config::DatabaseConfig;
use common::{Error, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::utils::retry::retry_with_backoff;

const CONNECT_RETRIES: u32 = 2;
const CONNECT_BACKOFF_MS: u64 = 500;

/// Builds a pool for one store. Exhausted retries surface as `Error::Connectivity`.
pub async fn connect(label: &str, config: &DatabaseConfig) -> Result<PgPool> {
    let pool = retry_with_backoff(label, CONNECT_RETRIES, CONNECT_BACKOFF_MS, || async {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| Error::Connectivity(format!("{} database unreachable: {}", label, e)))
    })
    .await?;

    info!(store = label, max_connections = config.max_connections, "Connected");
    Ok(pool)
}
