//! Marketplace user roles.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not a known role.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid user role: {0}")]
pub struct RoleError(pub String);

/// The role a user signed up with.
///
/// Stored as lowercase text in the backend's `users` table and in the auth
/// provider's user metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Someone looking for opportunities. The default for new identities.
    #[default]
    Volunteer,
    /// Someone acting on behalf of an organization.
    Organization,
}

impl UserRole {
    /// Returns the wire representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Volunteer => "volunteer",
            Self::Organization => "organization",
        }
    }

    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Volunteer => "Volunteer",
            Self::Organization => "Organization",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volunteer" => Ok(Self::Volunteer),
            "organization" => Ok(Self::Organization),
            _ => Err(RoleError(s.to_string())),
        }
    }
}
