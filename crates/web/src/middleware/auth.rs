//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user in route handlers.
//! The signed-in user lives in the server-side session; handlers receive it
//! explicitly and pass it on to templates.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::models::{CurrentUser, keys};

/// Extractor that requires an authenticated user.
///
/// Page requests without a user are redirected to the login page with a
/// `redirectTo` parameter; `/api/` requests get a 401 JSON body.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests), carrying the original path.
    RedirectToLogin(String),
    /// Unauthorized response (for API requests).
    Unauthorized,
}

/// Login URL that returns to `path` after sign-in.
#[must_use]
pub fn login_redirect_url(path: &str) -> String {
    if path == "/" || path.is_empty() {
        return "/auth/login".to_string();
    }
    format!("/auth/login?redirectTo={}", urlencoding::encode(path))
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(path) => Redirect::to(&login_redirect_url(&path)).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": "Authentication required" })),
            )
                .into_response(),
        }
    }
}

fn rejection_for(parts: &Parts) -> AuthRejection {
    // Nested routers see a stripped uri
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |OriginalUri(uri)| uri);
    let path = uri.path();
    if path.starts_with("/api/") {
        AuthRejection::Unauthorized
    } else {
        let original = uri
            .path_and_query()
            .map_or(path, |pq| pq.as_str());
        AuthRejection::RedirectToLogin(original.to_string())
    }
}

async fn current_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match current_user(parts).await {
            Some(user) => Ok(Self(user)),
            None => Err(rejection_for(parts)),
        }
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not
/// logged in. Used by public pages to render the navigation.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await))
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session id first so a pre-login session id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to end the session entirely (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_page_requests_redirect_with_return_path() {
        let rejection = rejection_for(&parts("/organizations/register?from=nav"));
        assert_eq!(
            rejection,
            AuthRejection::RedirectToLogin("/organizations/register?from=nav".to_string())
        );
    }

    #[test]
    fn test_api_requests_are_unauthorized() {
        assert_eq!(
            rejection_for(&parts("/api/organizations")),
            AuthRejection::Unauthorized
        );
    }

    #[test]
    fn test_login_redirect_url() {
        assert_eq!(login_redirect_url("/"), "/auth/login");
        assert_eq!(
            login_redirect_url("/profile"),
            "/auth/login?redirectTo=%2Fprofile"
        );
    }

    #[tokio::test]
    async fn test_missing_session_is_anonymous() {
        let mut parts = parts("/profile");
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());

        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::RedirectToLogin(_))));
    }
}
