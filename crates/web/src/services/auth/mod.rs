//! Authentication service.
//!
//! Identity is delegated to the backend's auth provider. This module turns
//! provider sessions into a [`CurrentUser`] for the server-side session and
//! makes sure every signed-in identity has a profile.

mod error;

pub use error::AuthError;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{instrument, warn};

use volunteer_hub_core::{Email, UserRole};

use crate::backend::{AuthSession, BackendClient, IdentityMetadata, SignUpResponse};
use crate::models::CurrentUser;
use crate::services::profiles::{ProfileSeed, default_name, ensure_profile};

/// Minimum password length accepted by the auth provider.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// PKCE verifier length (RFC 7636 allows 43-128).
const VERIFIER_LENGTH: usize = 64;

/// Generate a random alphanumeric string.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET.get(idx).map_or('A', |b| char::from(*b))
        })
        .collect()
}

// =============================================================================
// OAuth
// =============================================================================

/// Supported OAuth providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    LinkedIn,
}

impl OAuthProvider {
    /// Provider id understood by the auth API.
    #[must_use]
    pub const fn provider_id(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::LinkedIn => "linkedin_oidc",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "linkedin" => Ok(Self::LinkedIn),
            other => Err(AuthError::UnknownProvider(other.to_string())),
        }
    }
}

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(generate_random_string(VERIFIER_LENGTH))
    }

    /// Derive the challenge for a known verifier.
    #[must_use]
    pub fn from_verifier(verifier: String) -> Self {
        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(digest);
        Self {
            verifier,
            challenge,
        }
    }
}

/// Local path to continue to after sign-in.
///
/// Only same-origin absolute paths are honored; anything else (including
/// protocol-relative `//host` URLs) falls back to the site root.
#[must_use]
pub fn safe_redirect(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

// =============================================================================
// Password Authentication
// =============================================================================

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Sign-in form.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub redirect_to: Option<String>,
}

/// What happened after a successful sign-up.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The provider issued a session straight away.
    SignedIn(CurrentUser),
    /// The provider sent a confirmation email; no session yet.
    ConfirmationRequired { email: String },
}

/// Register a new identity and its profile.
///
/// A profile insert failure does not fail the sign-up; the identity exists
/// and reconciliation will backfill the profile.
///
/// # Errors
///
/// Returns an error if the form is invalid or the provider rejects it.
#[instrument(skip(backend, form), fields(email = %form.email, role = %form.role))]
pub async fn sign_up(backend: &BackendClient, form: &SignUpForm) -> Result<SignUpOutcome, AuthError> {
    let email = Email::parse(form.email.trim())?;
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_LENGTH));
    }

    let name = default_name(Some(&form.name), Some(email.as_str()));
    let metadata = IdentityMetadata {
        name: Some(name.clone()),
        role: Some(form.role.as_str().to_string()),
        extra: serde_json::Map::new(),
    };

    let response = backend
        .sign_up(email.as_str(), &form.password, &metadata)
        .await?;

    let identity = response.identity();
    let seed = ProfileSeed {
        id: identity.id,
        email: email.as_str().to_string(),
        name,
        role: form.role,
        created_at: identity.created_at,
    };
    if let Err(e) = ensure_profile(backend, seed).await {
        warn!(error = %e, "Failed to create profile after sign-up");
    }

    match response {
        SignUpResponse::Session(session) => {
            Ok(SignUpOutcome::SignedIn(current_user(backend, session).await))
        }
        SignUpResponse::User(_) => Ok(SignUpOutcome::ConfirmationRequired {
            email: email.into_inner(),
        }),
    }
}

/// Sign in with email and password.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] if the provider rejects the
/// credentials.
#[instrument(skip(backend, form), fields(email = %form.email))]
pub async fn sign_in(backend: &BackendClient, form: &SignInForm) -> Result<CurrentUser, AuthError> {
    let session = backend
        .sign_in_with_password(form.email.trim(), &form.password)
        .await
        .map_err(|e| match AuthError::from(e) {
            AuthError::Rejected(_) => AuthError::InvalidCredentials,
            other => other,
        })?;

    Ok(current_user(backend, session).await)
}

/// Finish an OAuth sign-in by exchanging the authorization code.
///
/// # Errors
///
/// Returns an error if the provider rejects the code or verifier.
#[instrument(skip_all)]
pub async fn complete_oauth(
    backend: &BackendClient,
    code: &str,
    verifier: &str,
) -> Result<CurrentUser, AuthError> {
    let session = backend.exchange_code(code, verifier).await?;
    Ok(current_user(backend, session).await)
}

/// Best-effort provider logout. The caller flushes the local session
/// regardless of the outcome.
pub async fn sign_out(backend: &BackendClient, user: &CurrentUser) {
    if let Err(e) = backend.sign_out(&user.access_token).await {
        warn!(user_id = %user.id, error = %e, "Provider logout failed");
    }
}

/// Ensure a profile exists and build the session identity from it.
///
/// Falls back to metadata-derived values when the profile store is
/// unavailable so that a backend hiccup does not block sign-in.
async fn current_user(backend: &BackendClient, session: AuthSession) -> CurrentUser {
    let seed = ProfileSeed::from_identity(&session.user);
    let (name, role) = match ensure_profile(backend, seed.clone()).await {
        Ok(outcome) => {
            let profile = outcome.into_profile();
            (profile.name, profile.role)
        }
        Err(e) => {
            warn!(user_id = %seed.id, error = %e, "Failed to ensure profile at sign-in");
            (seed.name, seed.role)
        }
    };

    CurrentUser {
        id: session.user.id,
        email: session.user.email.unwrap_or(seed.email),
        name,
        role,
        access_token: session.access_token,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_rfc7636_vector() {
        let pkce =
            PkceChallenge::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_pkce_generate() {
        let a = PkceChallenge::generate();
        let b = PkceChallenge::generate();
        assert_eq!(a.verifier.len(), VERIFIER_LENGTH);
        assert_ne!(a.verifier, b.verifier);
        assert!(!a.challenge.contains('='));
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("google".parse::<OAuthProvider>().unwrap(), OAuthProvider::Google);
        assert_eq!(
            "linkedin".parse::<OAuthProvider>().unwrap().provider_id(),
            "linkedin_oidc"
        );
        assert!(matches!(
            "github".parse::<OAuthProvider>(),
            Err(AuthError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/profile")), "/profile");
        assert_eq!(
            safe_redirect(Some("/organizations/register?step=2")),
            "/organizations/register?step=2"
        );
        assert_eq!(safe_redirect(Some("//evil.example.com")), "/");
        assert_eq!(safe_redirect(Some("https://evil.example.com")), "/");
        assert_eq!(safe_redirect(Some("/\\evil.example.com")), "/");
        assert_eq!(safe_redirect(None), "/");
    }

    #[test]
    fn test_backend_4xx_becomes_rejection() {
        let err = AuthError::from(crate::backend::BackendError::Api {
            status: 422,
            message: "User already registered".to_string(),
            code: Some("user_already_exists".to_string()),
        });
        assert_eq!(err.user_message(), "User already registered");

        let err = AuthError::from(crate::backend::BackendError::RateLimited(1));
        assert!(matches!(err, AuthError::Backend(_)));
    }

    #[test]
    fn test_sign_up_form_defaults_role() {
        let form: SignUpForm =
            serde_json::from_str(r#"{"email":"a@example.com","password":"hunter22"}"#).unwrap();
        assert_eq!(form.role, UserRole::Volunteer);
    }
}
