//! Identity/profile diagnostics.
//!
//! Only mounted when `HUB_DEBUG_ROUTES` is enabled. Both endpoints use the
//! service-role key, so they must never be exposed publicly.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tracing::instrument;

use crate::error::Result;
use crate::services::profiles::{self, ReconcileReport, UserComparison};
use crate::state::AppState;

/// Build the debug API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/debug/users", get(users))
        .route("/api/debug/fix-users", post(fix_users))
}

/// Compare provider identities with profile rows.
///
/// # Errors
///
/// Returns an error if either listing fails.
#[instrument(skip_all)]
pub async fn users(State(state): State<AppState>) -> Result<Json<UserComparison>> {
    let comparison = profiles::compare_all(state.backend()).await?;
    tracing::info!(
        auth_count = comparison.auth_count,
        profile_count = comparison.profile_count,
        missing = comparison.missing_users.len(),
        "Compared identities and profiles"
    );
    Ok(Json(comparison))
}

/// Create profiles for identities that have none.
///
/// # Errors
///
/// Returns an error if either listing fails. Per-identity insert failures
/// are reported in the body.
#[instrument(skip_all)]
pub async fn fix_users(State(state): State<AppState>) -> Result<Json<ReconcileReport>> {
    let report = profiles::reconcile_all(state.backend()).await?;
    tracing::info!(
        total = report.total,
        fixed = report.fixed,
        failed = report.failed,
        "Reconciled profiles"
    );
    Ok(Json(report))
}
