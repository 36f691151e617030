//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, Opportunity};
use crate::state::AppState;

/// Number of opportunities featured on the home page.
const FEATURED_COUNT: usize = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub current_user: Option<CurrentUser>,
    pub featured: Vec<Opportunity>,
    pub error: Option<String>,
}

/// Display the home page with the most recent opportunities.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    let (featured, error) = match state.backend().list_opportunities(Some(FEATURED_COUNT)).await {
        Ok(opportunities) => (opportunities, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load featured opportunities");
            (Vec::new(), Some("Failed to load opportunities.".to_string()))
        }
    };

    HomeTemplate {
        current_user: user,
        featured,
        error,
    }
}
