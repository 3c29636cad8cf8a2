//! Database repositories for data access layer
//
// Attachment records (posts + postmeta)
pub mod attachment;
//
// Transaction utilities
pub mod transaction;

pub use attachment::AttachmentRepository;

use mediaconv_core::{AppError, ConverterConfig};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;

/// Open the connection pool described by the configuration
pub async fn connect_pool(config: &ConverterConfig) -> Result<MySqlPool, AppError> {
    tracing::info!("Connecting to database...");
    let pool = MySqlPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    Ok(pool)
}
