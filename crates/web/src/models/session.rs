//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use volunteer_hub_core::{ProfileId, UserRole};

/// Session-stored user identity.
///
/// Written at sign-in and read by the auth extractors. The access token is
/// only used for the best-effort provider logout.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth provider identity id (also the profile id).
    pub id: ProfileId,
    /// User's email address.
    pub email: String,
    /// Display name from the profile.
    pub name: String,
    /// Role from the profile.
    pub role: UserRole,
    /// Provider access token.
    pub access_token: String,
}

impl CurrentUser {
    /// Whether the user signed up on behalf of an organization.
    #[must_use]
    pub fn is_organization(&self) -> bool {
        self.role == UserRole::Organization
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the PKCE code verifier of an in-flight OAuth sign-in.
    pub const OAUTH_VERIFIER: &str = "oauth_verifier";

    /// Key for the local path to return to after OAuth completes.
    pub const OAUTH_REDIRECT: &str = "oauth_redirect";
}
