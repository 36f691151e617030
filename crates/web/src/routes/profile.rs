//! Profile page (requires auth).

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Profile};
use crate::services::profiles::ProfileStore;
use crate::state::AppState;

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub current_user: Option<CurrentUser>,
    pub user: CurrentUser,
    pub profile: Option<Profile>,
    pub error: Option<String>,
}

/// Show the signed-in user's profile row.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    let (profile, error) = match state.backend().find_profile(user.id).await {
        Ok(profile) => (profile, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load profile");
            (None, Some("Failed to load profile.".to_string()))
        }
    };

    ProfileTemplate {
        current_user: Some(user.clone()),
        user,
        profile,
        error,
    }
}
