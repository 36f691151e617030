//! HTTP route handlers for Volunteer Hub.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page (3 most recent opportunities)
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Session store connectivity
//!
//! # Opportunities
//! GET  /opportunities                 - Opportunity listing
//! GET  /opportunities/{id}            - Opportunity detail
//!
//! # Registered organizations
//! GET  /organizations                 - Listing
//! GET  /organizations/register        - Registration form (auth)
//! POST /organizations/register        - Registration action (auth)
//! GET  /organizations/dashboard       - Organization dashboard (auth)
//!
//! # External directory
//! GET  /external-organizations        - Search page
//! GET  /external-organizations/{id}   - Detail page
//!
//! # Profile
//! GET  /profile                       - Profile page (auth)
//!
//! # Auth
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action (rate limited)
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action (rate limited)
//! POST /auth/logout                   - Logout action
//! GET  /auth/oauth/{provider}         - Start OAuth (google, linkedin)
//! GET  /auth/callback                 - OAuth completion
//!
//! # JSON API (rate limited)
//! GET  /api/external-organizations      - Directory search
//! GET  /api/external-organizations/{id} - Directory record
//! POST /api/organizations               - Organization registration (auth)
//! GET  /api/debug/users                 - Identity/profile comparison (debug only)
//! POST /api/debug/fix-users             - Profile reconciliation (debug only)
//! ```

pub mod api;
pub mod auth;
pub mod directory;
pub mod home;
pub mod opportunities;
pub mod organizations;
pub mod profile;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout))
        .route("/oauth/{provider}", get(auth::oauth_start))
        .route("/callback", get(auth::callback))
        .merge(limited)
}

/// Create the opportunity routes router.
pub fn opportunity_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(opportunities::index))
        .route("/{id}", get(opportunities::show))
}

/// Create the registered organization routes router.
pub fn organization_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(organizations::index))
        .route(
            "/register",
            get(organizations::register_page).post(organizations::register),
        )
        .route("/dashboard", get(organizations::dashboard))
}

/// Create the external directory routes router.
pub fn directory_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(directory::index))
        .route("/{id}", get(directory::show))
}

/// Create all routes for the site.
///
/// `debug_routes` mounts the identity/profile diagnostics under `/api/debug`.
pub fn routes(debug_routes: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/opportunities", opportunity_routes())
        .nest("/organizations", organization_routes())
        .nest("/external-organizations", directory_routes())
        .route("/profile", get(profile::show))
        .nest("/auth", auth_routes())
        .merge(api::router(debug_routes).route_layer(api_rate_limiter()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::directory::tests::florida;

    fn app(debug_routes: bool) -> Router {
        routes(debug_routes).with_state(AppState::for_tests(florida()))
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_debug_routes_hidden_by_default() {
        let response = app(false)
            .oneshot(request("GET", "/api/debug/users"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_debug_routes_mounted_when_enabled() {
        let response = app(true)
            .oneshot(request("GET", "/api/debug/users"))
            .await
            .unwrap();
        // Mounted; the test backend is unreachable
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_api_directory_through_full_router() {
        let response = app(false)
            .oneshot(request("GET", "/api/external-organizations?city=Miami"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_page_redirects_to_login() {
        let response = app(false)
            .oneshot(request("GET", "/organizations/dashboard"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login?redirectTo=%2Forganizations%2Fdashboard"
        );
    }

    #[tokio::test]
    async fn test_malformed_ids_are_bad_requests() {
        for uri in ["/opportunities/not-a-uuid", "/external-organizations/abc"] {
            let response = app(false).oneshot(request("GET", uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_directory_page_renders_search_results() {
        let response = app(false)
            .oneshot(request("GET", "/external-organizations?city=Orlando"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Orlando Animal Rescue"));
        assert!(!html.contains("Miami Food Bank"));
    }
}
