//! Organization self-registration.
//!
//! There is one creation path: validate the form, reject names that collide
//! with any existing organization (compared trimmed and lowercased), then
//! insert with a fresh id.

use std::future::Future;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use volunteer_hub_core::{Email, OrganizationId};

use crate::backend::BackendError;
use crate::models::Organization;

/// Message returned for any validation failure.
pub const INVALID_FORM_MESSAGE: &str = "Invalid form data. Please check your inputs.";

pub const NAME_MIN_CHARS: usize = 2;
pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const ADDRESS_MIN_CHARS: usize = 5;

/// Read/write access to the `organizations` table.
pub trait OrganizationStore: Send + Sync {
    /// Names of every registered organization.
    fn list_organization_names(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;

    /// Insert a new organization row.
    fn insert_organization(
        &self,
        organization: &Organization,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Registration form as submitted (HTML form or JSON body).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: String,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOrganization {
    pub name: String,
    pub email: Email,
    pub website: Option<String>,
    pub description: String,
    pub phone: Option<String>,
    pub address: String,
}

/// Validation failure. Displays only the generic message; the offending
/// fields are kept for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid form data. Please check your inputs.")]
pub struct ValidationError {
    pub fields: Vec<&'static str>,
}

/// Why a registration did not produce an organization.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("An organization named \"{0}\" already exists.")]
    DuplicateName(String),

    #[error("{}", .0.message())]
    Backend(#[from] BackendError),
}

/// Registration outcome in the shape the JSON API and form pages return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<OrganizationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Result<OrganizationId, RegistrationError>> for RegistrationResult {
    fn from(result: &Result<OrganizationId, RegistrationError>) -> Self {
        match result {
            Ok(id) => Self {
                success: true,
                organization_id: Some(*id),
                error: None,
            },
            Err(e) => Self {
                success: false,
                organization_id: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Treat missing and blank optionals the same.
fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Key used for duplicate-name comparison.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl OrganizationForm {
    /// Check every field and collect the ones that fail.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing each invalid field.
    pub fn validate(&self) -> Result<ValidOrganization, ValidationError> {
        let mut fields = Vec::new();

        if self.name.chars().count() < NAME_MIN_CHARS {
            fields.push("name");
        }

        let email = Email::parse(&self.email);
        if email.is_err() {
            fields.push("email");
        }

        let website = non_blank(self.website.as_ref());
        if let Some(website) = &website
            && url::Url::parse(website).is_err()
        {
            fields.push("website");
        }

        let description_len = self.description.chars().count();
        if !(DESCRIPTION_MIN_CHARS..=DESCRIPTION_MAX_CHARS).contains(&description_len) {
            fields.push("description");
        }

        if self.address.chars().count() < ADDRESS_MIN_CHARS {
            fields.push("address");
        }

        match email {
            Ok(email) if fields.is_empty() => Ok(ValidOrganization {
                name: self.name.clone(),
                email,
                website,
                description: self.description.clone(),
                phone: non_blank(self.phone.as_ref()),
                address: self.address.clone(),
            }),
            _ => Err(ValidationError { fields }),
        }
    }
}

/// Register an organization.
///
/// The caller is responsible for requiring an authenticated session.
///
/// # Errors
///
/// - [`RegistrationError::Validation`] if the form is invalid (nothing is
///   written)
/// - [`RegistrationError::DuplicateName`] if any existing organization has the
///   same trimmed, lowercased name
/// - [`RegistrationError::Backend`] if listing names or the insert fails
#[instrument(skip(store, form), fields(name = %form.name))]
pub async fn register<S: OrganizationStore>(
    store: &S,
    form: &OrganizationForm,
) -> Result<OrganizationId, RegistrationError> {
    let valid = form.validate().inspect_err(|e| {
        debug!(fields = ?e.fields, "Organization form failed validation");
    })?;

    let wanted = normalize_name(&valid.name);
    let existing = store.list_organization_names().await?;
    if existing.iter().any(|name| normalize_name(name) == wanted) {
        return Err(RegistrationError::DuplicateName(valid.name.trim().to_string()));
    }

    let organization = Organization {
        id: OrganizationId::generate(),
        name: valid.name,
        email: valid.email.into_inner(),
        website: valid.website,
        description: valid.description,
        phone: valid.phone,
        address: valid.address,
        created_at: Utc::now(),
    };
    store.insert_organization(&organization).await?;

    info!(organization_id = %organization.id, "Registered organization");
    Ok(organization.id)
}
