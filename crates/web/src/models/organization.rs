//! User-registered organizations (`organizations` table).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volunteer_hub_core::OrganizationId;

use super::{blank_as_none, null_as_empty};

/// An organization registered through the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub website: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Projection used by the duplicate-name check.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationName {
    pub name: String,
}
