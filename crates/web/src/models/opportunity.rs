//! Volunteer opportunities (`opportunities` table, read only).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use volunteer_hub_core::{OpportunityId, OrganizationId};

use super::blank_as_none;

/// Display name used when an opportunity has no joined organization.
pub const FALLBACK_ORGANIZATION_NAME: &str = "Organization";

/// The embedded `organizations(name)` join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    pub name: String,
}

/// A volunteer opportunity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub title: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub organization_id: Option<OrganizationId>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub organizations: Option<OrganizationRef>,
}

impl Opportunity {
    /// Name of the organization running this opportunity.
    #[must_use]
    pub fn display_organization(&self) -> &str {
        self.organizations
            .as_ref()
            .map(|org| org.name.as_str())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(FALLBACK_ORGANIZATION_NAME)
    }

    /// Human-readable date, e.g. "March 9, 2025".
    #[must_use]
    pub fn display_date(&self) -> Option<String> {
        self.date.map(|d| d.format("%B %-d, %Y").to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ROW: &str = r#"{
        "id": "5f1d8c6e-3a0a-4a43-9a7e-2f9e3f8b1c22",
        "title": "Beach Cleanup",
        "description": "Help clear the shoreline.",
        "category": "Environment",
        "location": "Miami, FL",
        "date": "2025-03-09",
        "image_url": "",
        "organization_id": "0b7c7c53-5a55-4c1f-9d3f-6f0c3b9f2a11",
        "created_at": "2025-02-01T09:30:00+00:00",
        "organizations": {"name": "Ocean Guardians"}
    }"#;

    #[test]
    fn test_joined_organization_name() {
        let opportunity: Opportunity = serde_json::from_str(ROW).unwrap();
        assert_eq!(opportunity.display_organization(), "Ocean Guardians");
        assert!(opportunity.image_url.is_none());
        assert_eq!(opportunity.display_date().as_deref(), Some("March 9, 2025"));
    }

    #[test]
    fn test_missing_join_falls_back() {
        let mut opportunity: Opportunity = serde_json::from_str(ROW).unwrap();
        opportunity.organizations = None;
        assert_eq!(opportunity.display_organization(), FALLBACK_ORGANIZATION_NAME);
    }
}
