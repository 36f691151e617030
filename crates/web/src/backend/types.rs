//! Wire types for the auth API.
//!
//! Table rows live in [`crate::models`]; these are the shapes that only the
//! auth provider produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volunteer_hub_core::ProfileId;

/// Free-form metadata the auth provider stores alongside an identity.
///
/// Sign-up writes `name` and `role`; OAuth providers add their own keys,
/// which are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An identity record from the auth provider's built-in user table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: ProfileId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_metadata: IdentityMetadata,
    pub created_at: DateTime<Utc>,
}

/// Session returned by a successful sign-in or token exchange.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AuthIdentity,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

/// Sign-up response.
///
/// With email confirmation disabled the provider returns a full session;
/// otherwise it returns only the pending user.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthSession),
    User(AuthIdentity),
}

impl SignUpResponse {
    /// The identity that was created.
    #[must_use]
    pub const fn identity(&self) -> &AuthIdentity {
        match self {
            Self::Session(session) => &session.user,
            Self::User(user) => user,
        }
    }
}

/// One page of the admin user listing.
#[derive(Debug, Deserialize)]
pub(crate) struct AdminUsersPage {
    #[serde(default)]
    pub users: Vec<AuthIdentity>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
