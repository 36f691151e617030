//! Domain models.
//!
//! Rows of the backend's `users`, `organizations` and `opportunities` tables,
//! plus the identity kept in the server-side session.

pub mod opportunity;
pub mod organization;
pub mod profile;
pub mod session;

pub use opportunity::{Opportunity, OrganizationRef};
pub use organization::Organization;
pub use profile::Profile;
pub use session::{CurrentUser, keys};

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable string column as an empty string.
pub(crate) fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize a nullable string column, mapping blank values to `None`.
pub(crate) fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}
