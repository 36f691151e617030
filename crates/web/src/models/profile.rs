//! Application profile rows (`users` table).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volunteer_hub_core::{ProfileId, UserRole};

use super::null_as_empty;

/// A user's application profile.
///
/// The `id` equals the auth provider's identity id; there is at most one
/// profile per identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_row() {
        let json = r#"{
            "id": "0b7c7c53-5a55-4c1f-9d3f-6f0c3b9f2a11",
            "email": "sam@example.com",
            "name": null,
            "role": "organization",
            "created_at": "2024-03-01T12:00:00+00:00"
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.email, "sam@example.com");
        assert_eq!(profile.name, "");
        assert_eq!(profile.role, UserRole::Organization);
    }
}
