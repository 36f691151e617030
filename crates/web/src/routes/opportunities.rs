//! Opportunity route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use volunteer_hub_core::OpportunityId;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, Opportunity};
use crate::state::AppState;

/// Opportunity listing template.
#[derive(Template, WebTemplate)]
#[template(path = "opportunities/index.html")]
pub struct OpportunitiesTemplate {
    pub current_user: Option<CurrentUser>,
    pub opportunities: Vec<Opportunity>,
    pub error: Option<String>,
}

/// Opportunity detail template.
#[derive(Template, WebTemplate)]
#[template(path = "opportunities/show.html")]
pub struct OpportunityTemplate {
    pub current_user: Option<CurrentUser>,
    pub opportunity: Option<Opportunity>,
    pub error: Option<String>,
}

/// List all opportunities, newest first.
///
/// A backend failure renders the empty listing with an inline error.
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    let (opportunities, error) = match state.backend().list_opportunities(None).await {
        Ok(opportunities) => (opportunities, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load opportunities");
            (Vec::new(), Some("Failed to load opportunities.".to_string()))
        }
    };

    OpportunitiesTemplate {
        current_user: user,
        opportunities,
        error,
    }
}

/// Show a single opportunity.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Response {
    let page = |status: StatusCode, opportunity: Option<Opportunity>, error: Option<&str>| {
        (
            status,
            OpportunityTemplate {
                current_user: user.clone(),
                opportunity,
                error: error.map(str::to_string),
            },
        )
            .into_response()
    };

    let Ok(id) = id.parse::<OpportunityId>() else {
        return page(StatusCode::BAD_REQUEST, None, Some("Invalid ID format"));
    };

    match state.backend().find_opportunity(id).await {
        Ok(Some(opportunity)) => page(StatusCode::OK, Some(opportunity), None),
        Ok(None) => page(StatusCode::NOT_FOUND, None, Some("Opportunity not found")),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load opportunity");
            page(
                StatusCode::BAD_GATEWAY,
                None,
                Some("Failed to load opportunity."),
            )
        }
    }
}
