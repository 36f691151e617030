//! Data API calls (`/rest/v1`).

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::instrument;

use volunteer_hub_core::{OpportunityId, ProfileId};

use super::client::{CallKind, KeyKind};
use super::{BackendClient, BackendError};
use crate::models::organization::OrganizationName;
use crate::models::{Opportunity, Organization, Profile};
use crate::services::organizations::OrganizationStore;
use crate::services::profiles::ProfileStore;

const USERS: &str = "rest/v1/users";
const ORGANIZATIONS: &str = "rest/v1/organizations";
const OPPORTUNITIES: &str = "rest/v1/opportunities";

/// Rows requested per page when reading a whole table.
///
/// The data API silently caps responses at its configured max rows, so full
/// reads page until an empty page comes back rather than trusting one GET.
const PAGE_SIZE: usize = 500;

impl BackendClient {
    /// All registered organizations, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, BackendError> {
        let url = self.url(
            ORGANIZATIONS,
            &[("select", "*"), ("order", "created_at.desc")],
        )?;
        self.send_json(CallKind::Read, || {
            self.request(Method::GET, url.clone(), KeyKind::ServiceRole, None)
        })
        .await
    }

    /// Opportunities with their organization name joined, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn list_opportunities(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<Opportunity>, BackendError> {
        let limit = limit.map(|n| n.to_string());
        let mut query = vec![
            ("select", "*,organizations(name)"),
            ("order", "created_at.desc"),
        ];
        if let Some(limit) = limit.as_deref() {
            query.push(("limit", limit));
        }
        let url = self.url(OPPORTUNITIES, &query)?;

        self.send_json(CallKind::Read, || {
            self.request(Method::GET, url.clone(), KeyKind::ServiceRole, None)
        })
        .await
    }

    /// A single opportunity with its organization name joined.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(opportunity_id = %id))]
    pub async fn find_opportunity(
        &self,
        id: OpportunityId,
    ) -> Result<Option<Opportunity>, BackendError> {
        let filter = format!("eq.{id}");
        let url = self.url(
            OPPORTUNITIES,
            &[
                ("select", "*,organizations(name)"),
                ("id", filter.as_str()),
                ("limit", "1"),
            ],
        )?;
        let rows: Vec<Opportunity> = self
            .send_json(CallKind::Read, || {
                self.request(Method::GET, url.clone(), KeyKind::ServiceRole, None)
            })
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Every row of a table, fetched page by page with `offset` + `limit`.
    ///
    /// `order` must be a total order so pages do not overlap.
    async fn fetch_all<T: DeserializeOwned>(
        &self,
        table: &str,
        select: &str,
        order: &str,
    ) -> Result<Vec<T>, BackendError> {
        let limit = PAGE_SIZE.to_string();
        let mut rows = Vec::new();

        loop {
            let offset = rows.len().to_string();
            let url = self.url(
                table,
                &[
                    ("select", select),
                    ("order", order),
                    ("limit", limit.as_str()),
                    ("offset", offset.as_str()),
                ],
            )?;
            let batch: Vec<T> = self
                .send_json(CallKind::Read, || {
                    self.request(Method::GET, url.clone(), KeyKind::ServiceRole, None)
                })
                .await?;

            if batch.is_empty() {
                break;
            }
            rows.extend(batch);
        }

        tracing::debug!(table, count = rows.len(), "Fetched all rows");
        Ok(rows)
    }

    /// Insert a row and discard the representation.
    async fn insert_row<T: serde::Serialize + Sync>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<(), BackendError> {
        let url = self.url(table, &[])?;
        self.send(CallKind::Write, || {
            self.request(Method::POST, url.clone(), KeyKind::ServiceRole, None)
                .header("Prefer", "return=minimal")
                .json(row)
        })
        .await?;
        Ok(())
    }
}

impl ProfileStore for BackendClient {
    #[instrument(skip(self))]
    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        self.fetch_all(USERS, "*", "created_at.desc,id.asc").await
    }

    #[instrument(skip(self), fields(profile_id = %id))]
    async fn find_profile(&self, id: ProfileId) -> Result<Option<Profile>, BackendError> {
        let filter = format!("eq.{id}");
        let url = self.url(
            USERS,
            &[("select", "*"), ("id", filter.as_str()), ("limit", "1")],
        )?;
        let rows: Vec<Profile> = self
            .send_json(CallKind::Read, || {
                self.request(Method::GET, url.clone(), KeyKind::ServiceRole, None)
            })
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, profile), fields(profile_id = %profile.id))]
    async fn insert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
        self.insert_row(USERS, profile).await
    }
}

impl OrganizationStore for BackendClient {
    #[instrument(skip(self))]
    async fn list_organization_names(&self) -> Result<Vec<String>, BackendError> {
        let rows: Vec<OrganizationName> = self.fetch_all(ORGANIZATIONS, "name", "id.asc").await?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    #[instrument(skip(self, organization), fields(organization_id = %organization.id))]
    async fn insert_organization(&self, organization: &Organization) -> Result<(), BackendError> {
        self.insert_row(ORGANIZATIONS, organization).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};

    use super::super::client::tests::local_backend;
    use super::*;
    use crate::services::organizations::{OrganizationForm, RegistrationError, register};

    /// Serves `total` organization names, never more than `max_rows` per
    /// response regardless of the requested limit.
    fn capped_organizations(total: usize, max_rows: usize) -> Router {
        Router::new().route(
            "/rest/v1/organizations",
            get(move |Query(params): Query<HashMap<String, String>>| async move {
                let offset: usize = params["offset"].parse().unwrap();
                let limit: usize = params["limit"].parse().unwrap();
                let end = total.min(offset + limit.min(max_rows));
                let rows: Vec<serde_json::Value> = (offset.min(end)..end)
                    .map(|i| serde_json::json!({ "name": format!("Org {i}") }))
                    .collect();
                Json(rows)
            }),
        )
    }

    #[tokio::test]
    async fn test_organization_names_read_past_row_cap() {
        let client = local_backend(capped_organizations(1203, 200), 1).await;

        let names = client.list_organization_names().await.unwrap();

        assert_eq!(names.len(), 1203);
        assert_eq!(names.first().unwrap(), "Org 0");
        assert_eq!(names.last().unwrap(), "Org 1202");
    }

    #[tokio::test]
    async fn test_duplicate_check_sees_rows_past_row_cap() {
        let client = local_backend(capped_organizations(1001, 1000), 1).await;
        let form = OrganizationForm {
            name: "  org 1000 ".to_string(),
            email: "hello@org1000.example.org".to_string(),
            description: "A long enough description for the form.".to_string(),
            address: "12 Harbour Street".to_string(),
            ..OrganizationForm::default()
        };

        let result = register(&client, &form).await;

        assert!(matches!(result, Err(RegistrationError::DuplicateName(_))));
    }

    #[tokio::test]
    async fn test_empty_table_takes_one_request() {
        let client = local_backend(capped_organizations(0, 1000), 1).await;
        assert!(client.list_organization_names().await.unwrap().is_empty());
    }
}
