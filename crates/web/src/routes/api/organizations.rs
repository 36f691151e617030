//! Organization registration JSON API.

use axum::{Json, Router, extract::State, routing::post};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::organizations::{self, OrganizationForm, RegistrationResult};
use crate::state::AppState;

/// Build the organizations API router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/organizations", post(create))
}

/// Register an organization from a JSON body.
///
/// Failures answer `{success: false, error}` with 400 (invalid), 409
/// (duplicate name) or 502 (backend).
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<OrganizationForm>,
) -> Result<Json<RegistrationResult>> {
    let id = organizations::register(state.backend(), &form).await?;
    Ok(Json(RegistrationResult::from(&Ok(id))))
}
