//! External organization directory pages.
//!
//! Served from the in-memory dataset; no backend calls.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::directory::{DirectoryQuery, ExternalOrganization, LookupError};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Directory search page template.
#[derive(Template, WebTemplate)]
#[template(path = "directory/index.html")]
pub struct DirectoryTemplate {
    pub current_user: Option<CurrentUser>,
    pub organizations: Vec<ExternalOrganization>,
    pub query: DirectoryQuery,
    pub total: usize,
}

/// Directory detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "directory/show.html")]
pub struct DirectoryEntryTemplate {
    pub current_user: Option<CurrentUser>,
    pub organization: Option<ExternalOrganization>,
    pub error: Option<String>,
}

/// Search form and results.
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<DirectoryQuery>,
) -> impl IntoResponse {
    let organizations = state
        .directory()
        .search(&query)
        .into_iter()
        .cloned()
        .collect();

    DirectoryTemplate {
        current_user: user,
        organizations,
        query,
        total: state.directory().len(),
    }
}

/// One directory record; 400 for a malformed id, 404 for an unknown one.
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Response {
    let (status, organization, error) = match state.directory().find(&id) {
        Ok(org) => (StatusCode::OK, Some(org.clone()), None),
        Err(e @ LookupError::InvalidId) => (StatusCode::BAD_REQUEST, None, Some(e.to_string())),
        Err(e @ LookupError::NotFound) => (StatusCode::NOT_FOUND, None, Some(e.to_string())),
    };

    (
        status,
        DirectoryEntryTemplate {
            current_user: user,
            organization,
            error,
        },
    )
        .into_response()
}
