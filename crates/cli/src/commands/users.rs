//! Profile reconciliation.
//!
//! # Usage
//!
//! ```bash
//! vh-cli users reconcile [--dry-run]
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_URL`, `BACKEND_ANON_KEY`, `BACKEND_SERVICE_ROLE_KEY`

use thiserror::Error;
use volunteer_hub_web::backend::{BackendClient, BackendError};
use volunteer_hub_web::config::{BackendConfig, ConfigError};
use volunteer_hub_web::services::profiles;

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum UsersError {
    /// Backend configuration missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listing identities or profiles failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Report could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reconcile identities and profiles, printing the result as JSON.
///
/// With `dry_run` only the missing identities are printed.
///
/// # Errors
///
/// Returns an error if the backend is unreachable or a listing fails.
/// Individual insert failures are part of the printed report.
pub async fn reconcile(dry_run: bool) -> Result<(), UsersError> {
    let config = BackendConfig::from_env()?;
    let backend = BackendClient::new(&config)?;

    let output = if dry_run {
        let comparison = profiles::compare_all(&backend).await?;
        tracing::info!(
            auth_count = comparison.auth_count,
            profile_count = comparison.profile_count,
            missing = comparison.missing_users.len(),
            "Dry run: no profiles created"
        );
        serde_json::to_string_pretty(&comparison.missing_users)?
    } else {
        let report = profiles::reconcile_all(&backend).await?;
        tracing::info!(
            total = report.total,
            fixed = report.fixed,
            failed = report.failed,
            "Reconciliation complete"
        );
        serde_json::to_string_pretty(&report)?
    };

    #[allow(clippy::print_stdout)]
    {
        println!("{output}");
    }
    Ok(())
}
