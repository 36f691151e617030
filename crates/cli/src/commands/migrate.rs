//! Session store migration.
//!
//! # Usage
//!
//! ```bash
//! vh-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `HUB_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;
use volunteer_hub_web::config::{ConfigError, database_url_from_env};

/// Errors that can occur during migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database URL missing.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection or DDL error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create the `tower_sessions` schema and table if they do not exist.
///
/// # Errors
///
/// Returns an error if the database URL is missing or the DDL fails.
pub async fn sessions() -> Result<(), MigrationError> {
    let database_url = database_url_from_env()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session store migration complete!");
    Ok(())
}
