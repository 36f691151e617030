//! Authentication route handlers.
//!
//! Password sign-in and sign-up, OAuth (Google, LinkedIn) with PKCE, and
//! logout. The verified user is kept in the server-side session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use volunteer_hub_core::UserRole;

use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, keys};
use crate::services::auth::{
    self as auth_service, AuthError, OAuthProvider, PkceChallenge, SignInForm, SignUpForm,
    SignUpOutcome, safe_redirect,
};
use crate::state::AppState;

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
    pub error: Option<String>,
}

/// Query parameters for starting OAuth.
#[derive(Debug, Default, Deserialize)]
pub struct OAuthStartQuery {
    #[serde(rename = "redirectTo")]
    pub redirect_to: Option<String>,
}

/// Query parameters the provider sends back to the callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub current_user: Option<CurrentUser>,
    pub email: String,
    pub redirect_to: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub current_user: Option<CurrentUser>,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub error: Option<String>,
}

/// Shown when the provider requires email confirmation before sign-in.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register_success.html")]
pub struct RegisterSuccessTemplate {
    pub current_user: Option<CurrentUser>,
    pub email: String,
}

/// Map an error code from the query string to a message.
fn login_error_message(code: &str) -> &'static str {
    match code {
        "oauth" => "Sign-in with that provider failed. Please try again.",
        "session" => "Your sign-in session expired. Please try again.",
        _ => "Something went wrong. Please try again.",
    }
}

/// Persist the signed-in user and redirect.
async fn start_session(session: &Session, user: &CurrentUser, redirect_to: &str) -> Response {
    if let Err(e) = set_current_user(session, user).await {
        tracing::error!("Failed to set session: {}", e);
        return Redirect::to("/auth/login?error=session").into_response();
    }
    set_sentry_user(&user.id, Some(&user.email));
    Redirect::to(redirect_to).into_response()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        current_user: user,
        email: String::new(),
        redirect_to: safe_redirect(query.redirect_to.as_deref()),
        error: query.error.as_deref().map(|c| login_error_message(c).to_string()),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> Response {
    let redirect_to = safe_redirect(form.redirect_to.as_deref());

    match auth_service::sign_in(state.backend(), &form).await {
        Ok(user) => {
            add_breadcrumb("auth", "Signed in with password", None);
            start_session(&session, &user, &redirect_to).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let status = match e {
                AuthError::Backend(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::UNAUTHORIZED,
            };
            (
                status,
                LoginTemplate {
                    current_user: None,
                    email: form.email,
                    redirect_to,
                    error: Some(e.user_message()),
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
    RegisterTemplate {
        current_user: user,
        name: String::new(),
        email: String::new(),
        role: UserRole::default(),
        error: None,
    }
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignUpForm>,
) -> Response {
    match auth_service::sign_up(state.backend(), &form).await {
        Ok(SignUpOutcome::SignedIn(user)) => {
            add_breadcrumb("auth", "Signed up", Some(&[("role", user.role.as_str())]));
            start_session(&session, &user, "/").await
        }
        Ok(SignUpOutcome::ConfirmationRequired { email }) => RegisterSuccessTemplate {
            current_user: None,
            email,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            let status = match e {
                AuthError::Backend(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::BAD_REQUEST,
            };
            (
                status,
                RegisterTemplate {
                    current_user: None,
                    name: form.name,
                    email: form.email,
                    role: form.role,
                    error: Some(e.user_message()),
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout: best-effort provider logout, then flush the session.
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    if let Some(user) = user {
        auth_service::sign_out(state.backend(), &user).await;
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

// =============================================================================
// OAuth
// =============================================================================

/// Start an OAuth sign-in.
///
/// Stores a PKCE verifier (and the return path) in the session and redirects
/// to the provider via the auth API.
pub async fn oauth_start(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<OAuthStartQuery>,
) -> Response {
    let provider: OAuthProvider = match provider.parse() {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected OAuth provider");
            return (StatusCode::NOT_FOUND, e.user_message()).into_response();
        }
    };

    let pkce = PkceChallenge::generate();
    let redirect_to = safe_redirect(query.redirect_to.as_deref());

    if let Err(e) = session.insert(keys::OAUTH_VERIFIER, &pkce.verifier).await {
        tracing::error!("Failed to store OAuth verifier in session: {}", e);
        return Redirect::to("/auth/login?error=session").into_response();
    }
    if let Err(e) = session.insert(keys::OAUTH_REDIRECT, &redirect_to).await {
        tracing::error!("Failed to store OAuth redirect in session: {}", e);
        return Redirect::to("/auth/login?error=session").into_response();
    }

    let callback = state.config().oauth_callback_url();
    match state
        .backend()
        .authorize_url(provider.provider_id(), &callback, &pkce.challenge)
    {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build authorize URL");
            Redirect::to("/auth/login?error=oauth").into_response()
        }
    }
}

/// Complete an OAuth sign-in.
///
/// Exchanges the code using the stored verifier, ensures the profile exists,
/// and redirects to the stored return path.
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = &query.error {
        tracing::warn!(
            error = %error,
            description = ?query.error_description,
            "OAuth provider returned error"
        );
        return Redirect::to("/auth/login?error=oauth").into_response();
    }

    // Verifier and return path are single use
    let verifier: Option<String> = session
        .remove(keys::OAUTH_VERIFIER)
        .await
        .ok()
        .flatten();
    let redirect_to: Option<String> = session
        .remove(keys::OAUTH_REDIRECT)
        .await
        .ok()
        .flatten();

    let (Some(code), Some(verifier)) = (query.code, verifier) else {
        tracing::warn!("OAuth callback without code or stored verifier");
        return Redirect::to("/auth/login?error=session").into_response();
    };

    match auth_service::complete_oauth(state.backend(), &code, &verifier).await {
        Ok(user) => {
            add_breadcrumb("auth", "Signed in with OAuth", None);
            start_session(&session, &user, &safe_redirect(redirect_to.as_deref())).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "OAuth code exchange failed");
            Redirect::to("/auth/login?error=oauth").into_response()
        }
    }
}
