//! Registered organization pages.
//!
//! # Routes
//!
//! ```text
//! GET  /organizations            - Listing
//! GET  /organizations/register   - Registration form (auth)
//! POST /organizations/register   - Registration action (auth)
//! GET  /organizations/dashboard  - Organizations registered with the user's email (auth)
//! ```

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CurrentUser, Organization};
use crate::services::organizations::{self, OrganizationForm, RegistrationError};
use crate::state::AppState;

/// Query parameters for the listing page.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub registered: Option<String>,
}

/// Organization listing template.
#[derive(Template, WebTemplate)]
#[template(path = "organizations/index.html")]
pub struct OrganizationsTemplate {
    pub current_user: Option<CurrentUser>,
    pub organizations: Vec<Organization>,
    pub registered: bool,
    pub error: Option<String>,
}

/// Registration form template.
#[derive(Template, WebTemplate)]
#[template(path = "organizations/register.html")]
pub struct RegisterTemplate {
    pub current_user: Option<CurrentUser>,
    pub form: OrganizationForm,
    pub error: Option<String>,
}

/// Organization dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "organizations/dashboard.html")]
pub struct DashboardTemplate {
    pub current_user: Option<CurrentUser>,
    pub user: CurrentUser,
    pub organizations: Vec<Organization>,
    pub error: Option<String>,
}

/// List registered organizations.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let (organizations, error) = match state.backend().list_organizations().await {
        Ok(organizations) => (organizations, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load organizations");
            (Vec::new(), Some("Failed to load organizations.".to_string()))
        }
    };

    OrganizationsTemplate {
        current_user: user,
        organizations,
        registered: query.registered.is_some(),
        error,
    }
}

/// Display the registration form, pre-filled with the user's email.
pub async fn register_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    let form = OrganizationForm {
        email: user.email.clone(),
        ..OrganizationForm::default()
    };

    RegisterTemplate {
        current_user: Some(user),
        form,
        error: None,
    }
}

/// Handle registration form submission.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn register(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<OrganizationForm>,
) -> Response {
    add_breadcrumb("organizations", "Submitted registration form", None);

    match organizations::register(state.backend(), &form).await {
        Ok(id) => {
            tracing::info!(organization_id = %id, "Organization registered from form");
            Redirect::to("/organizations?registered=1").into_response()
        }
        Err(e) => {
            let status = match &e {
                RegistrationError::Validation(_) => StatusCode::BAD_REQUEST,
                RegistrationError::DuplicateName(_) => StatusCode::CONFLICT,
                RegistrationError::Backend(err) => {
                    tracing::error!(error = %err, "Organization insert failed");
                    StatusCode::BAD_GATEWAY
                }
            };
            (
                status,
                RegisterTemplate {
                    current_user: Some(user),
                    form,
                    error: Some(e.to_string()),
                },
            )
                .into_response()
        }
    }
}

/// Organizations whose contact email matches the signed-in user's.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dashboard(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> impl IntoResponse {
    let (organizations, error) = match state.backend().list_organizations().await {
        Ok(all) => (owned_by(all, &user.email), None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load organizations for dashboard");
            (Vec::new(), Some("Failed to load organizations.".to_string()))
        }
    };

    DashboardTemplate {
        current_user: Some(user.clone()),
        user,
        organizations,
        error,
    }
}

fn owned_by(organizations: Vec<Organization>, email: &str) -> Vec<Organization> {
    let email = email.trim().to_lowercase();
    organizations
        .into_iter()
        .filter(|org| org.email.trim().to_lowercase() == email)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use volunteer_hub_core::OrganizationId;

    use super::*;

    fn org(name: &str, email: &str) -> Organization {
        Organization {
            id: OrganizationId::generate(),
            name: name.to_string(),
            email: email.to_string(),
            website: None,
            description: "Community garden collective.".to_string(),
            phone: None,
            address: "12 Elm Street".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_owned_by_matches_email_case_insensitively() {
        let all = vec![
            org("Green Thumbs", "Team@GreenThumbs.org"),
            org("Other", "someone@else.org"),
        ];
        let mine = owned_by(all, "team@greenthumbs.org");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Green Thumbs");
    }
}
