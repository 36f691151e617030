//! Session-store database.
//!
//! The site keeps no tables of its own; users, organizations and opportunities
//! live in the managed backend. The backend's `PostgreSQL` database holds the
//! `tower_sessions` schema used by the session layer.
//!
//! # Migrations
//!
//! The session table is created by:
//! ```bash
//! cargo run -p volunteer-hub-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create the session-store connection pool.
///
/// Session reads and writes are small, so the pool stays modest.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url.expose_secret())
        .await
}

/// Round-trip a trivial query; used by the readiness probe.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database is unreachable.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
