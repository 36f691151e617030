//! Static directory of external organizations.
//!
//! The dataset is a JSON array bundled with the application and loaded once
//! at startup. It is never mutated; searches borrow from it.
//!
//! # Example
//!
//! ```rust,ignore
//! let directory = Directory::load(&config.directory_path)?;
//! let query = DirectoryQuery { city: Some("miami".into()), ..Default::default() };
//! let matches = directory.search(&query);
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::models::null_as_empty;

/// Errors that can occur while loading the dataset.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to read directory file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse directory file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a lookup by id produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Invalid ID format")]
    InvalidId,
    #[error("Organization not found")]
    NotFound,
}

/// A record from the external organization dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExternalOrganization {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub agency_guid: String,
    #[serde(default)]
    pub agency_type_id: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub province_description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub country_description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub country_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location_display: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url_for_public_page: String,
}

impl ExternalOrganization {
    /// Location line for listings; falls back to city and province.
    #[must_use]
    pub fn location(&self) -> String {
        if !self.location_display.trim().is_empty() {
            return self.location_display.clone();
        }
        [self.city.as_str(), self.province_description.as_str()]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Search parameters; every field is optional.
///
/// Textual filters are case-insensitive substring matches combined with AND.
/// Empty strings count as absent. A `limit` that is zero, negative or not a
/// number is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub province: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<usize>,
}

/// Deserialize an optional string, treating blank input as absent.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

/// Deserialize a limit, ignoring anything that is not a positive integer.
fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok()))
}

impl DirectoryQuery {
    /// Whether any textual filter is set.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        self.name.is_some()
            || self.city.is_some()
            || self.province.is_some()
            || self.country.is_some()
    }
}

/// Case-insensitive substring match; an absent filter matches everything.
fn matches(field: &str, filter: Option<&String>) -> bool {
    filter.is_none_or(|needle| field.to_lowercase().contains(&needle.trim().to_lowercase()))
}

/// In-memory, read-only table of external organizations.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    records: Vec<ExternalOrganization>,
}

impl Directory {
    /// Load the dataset from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array of
    /// records.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let directory = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            records = directory.len(),
            "Loaded organization directory"
        );
        Ok(directory)
    }

    /// Parse the dataset from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a JSON array of records.
    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        let records: Vec<ExternalOrganization> = serde_json::from_str(raw)?;
        Ok(Self { records })
    }

    /// Build a directory from records already in memory.
    #[must_use]
    pub const fn from_records(records: Vec<ExternalOrganization>) -> Self {
        Self { records }
    }

    /// Number of records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in file order.
    #[must_use]
    pub fn records(&self) -> &[ExternalOrganization] {
        &self.records
    }

    /// Records matching every supplied filter, in file order, truncated to
    /// `limit` when one is set.
    #[must_use]
    pub fn search(&self, query: &DirectoryQuery) -> Vec<&ExternalOrganization> {
        let filtered = self.records.iter().filter(|org| {
            matches(&org.name, query.name.as_ref())
                && matches(&org.city, query.city.as_ref())
                && matches(&org.province_description, query.province.as_ref())
                && matches(&org.country_description, query.country.as_ref())
        });

        match query.limit {
            Some(limit) => filtered.take(limit).collect(),
            None => filtered.collect(),
        }
    }

    /// Look up a record by its numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidId`] if `raw` is not an integer and
    /// [`LookupError::NotFound`] if no record has that id.
    pub fn find(&self, raw: &str) -> Result<&ExternalOrganization, LookupError> {
        let id: i64 = raw.trim().parse().map_err(|_| LookupError::InvalidId)?;
        self.records
            .iter()
            .find(|org| org.id == id)
            .ok_or(LookupError::NotFound)
    }

    /// Ids that appear on more than one record, ascending.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<i64> {
        let mut seen: HashMap<i64, usize> = HashMap::new();
        for org in &self.records {
            *seen.entry(org.id).or_insert(0) += 1;
        }
        let mut duplicates: Vec<i64> = seen
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id)
            .collect();
        duplicates.sort_unstable();
        duplicates
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn org(id: i64, name: &str, city: &str, province: &str, country: &str) -> ExternalOrganization {
        ExternalOrganization {
            id,
            agency_guid: format!("guid-{id}"),
            agency_type_id: 1,
            name: name.to_string(),
            city: city.to_string(),
            province_description: province.to_string(),
            country_description: country.to_string(),
            country_id: "US".to_string(),
            location_display: String::new(),
            url_for_public_page: String::new(),
        }
    }

    pub(crate) fn florida() -> Directory {
        Directory::from_records(vec![
            org(1, "Miami Food Bank", "Miami", "Florida", "United States"),
            org(2, "Orlando Animal Rescue", "Orlando", "Florida", "United States"),
            org(3, "Toronto Literacy Network", "Toronto", "Ontario", "Canada"),
        ])
    }

    #[test]
    fn test_city_filter_returns_exact_match() {
        let directory = Directory::from_records(vec![
            org(1, "Miami Food Bank", "Miami", "Florida", "United States"),
            org(2, "Orlando Animal Rescue", "Orlando", "Florida", "United States"),
        ]);
        let query = DirectoryQuery {
            city: Some("Miami".to_string()),
            ..Default::default()
        };
        let results = directory.search(&query);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
    }

    #[test]
    fn test_filters_are_case_insensitive_and_compose() {
        let directory = florida();
        let query = DirectoryQuery {
            province: Some("FLORIDA".to_string()),
            name: Some("rescue".to_string()),
            ..Default::default()
        };
        let results = directory.search(&query);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Orlando Animal Rescue");
    }

    #[test]
    fn test_every_result_matches_every_filter() {
        let directory = florida();
        let query = DirectoryQuery {
            country: Some("united".to_string()),
            ..Default::default()
        };
        let results = directory.search(&query);
        assert_eq!(results.len(), 2);
        assert!(
            results
                .iter()
                .all(|r| r.country_description.to_lowercase().contains("united"))
        );
    }

    #[test]
    fn test_no_filters_returns_everything_in_order() {
        let directory = florida();
        let ids: Vec<i64> = directory
            .search(&DirectoryQuery::default())
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_limit_truncates_in_source_order() {
        let directory = florida();
        let query = DirectoryQuery {
            limit: Some(2),
            ..Default::default()
        };
        let ids: Vec<i64> = directory.search(&query).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_limit_larger_than_matches() {
        let directory = florida();
        let query = DirectoryQuery {
            province: Some("ontario".to_string()),
            limit: Some(10),
            ..Default::default()
        };
        assert_eq!(directory.search(&query).len(), 1);
    }

    #[test]
    fn test_no_match_is_empty() {
        let directory = florida();
        let query = DirectoryQuery {
            city: Some("Atlantis".to_string()),
            ..Default::default()
        };
        assert!(directory.search(&query).is_empty());
    }

    #[test]
    fn test_query_string_parsing() {
        let query: DirectoryQuery =
            serde_json::from_str(r#"{"name":"","city":"Miami","limit":"abc"}"#).unwrap();
        assert_eq!(query.name, None);
        assert_eq!(query.city.as_deref(), Some("Miami"));
        assert_eq!(query.limit, None);

        let query: DirectoryQuery = serde_json::from_str(r#"{"limit":"-3"}"#).unwrap();
        assert_eq!(query.limit, None);
        let query: DirectoryQuery = serde_json::from_str(r#"{"limit":"0"}"#).unwrap();
        assert_eq!(query.limit, None);
        let query: DirectoryQuery = serde_json::from_str(r#"{"limit":"5"}"#).unwrap();
        assert_eq!(query.limit, Some(5));
        assert!(!query.has_filters());
    }

    #[test]
    fn test_find_by_id() {
        let directory = florida();
        assert_eq!(directory.find("2").unwrap().city, "Orlando");
        assert_eq!(directory.find(" 3 ").unwrap().city, "Toronto");
    }

    #[test]
    fn test_find_non_numeric_is_invalid_not_missing() {
        let directory = florida();
        assert_eq!(directory.find("abc"), Err(LookupError::InvalidId));
        assert_eq!(directory.find("1.5"), Err(LookupError::InvalidId));
        assert_eq!(directory.find(""), Err(LookupError::InvalidId));
    }

    #[test]
    fn test_find_rejects_trailing_garbage() {
        // "2abc" is not read as id 2.
        let directory = florida();
        assert_eq!(directory.find("2abc"), Err(LookupError::InvalidId));
        assert_eq!(directory.find("0x2"), Err(LookupError::InvalidId));
        assert_eq!(directory.find("+2").unwrap().city, "Orlando");
    }

    #[test]
    fn test_find_unknown_id() {
        assert_eq!(florida().find("999"), Err(LookupError::NotFound));
    }

    #[test]
    fn test_from_json_pascal_case_and_nulls() {
        let raw = r#"[{
            "Id": 42,
            "AgencyGuid": "abc",
            "AgencyTypeId": 3,
            "Name": "Harbor Help",
            "City": null,
            "ProvinceDescription": "Nova Scotia",
            "CountryDescription": "Canada",
            "CountryId": "CA",
            "LocationDisplay": "Halifax, NS",
            "UrlForPublicPage": "https://example.org/harbor"
        }]"#;
        let directory = Directory::from_json(raw).unwrap();
        let record = directory.find("42").unwrap();
        assert_eq!(record.name, "Harbor Help");
        assert_eq!(record.city, "");
        assert_eq!(record.location(), "Halifax, NS");
    }

    #[test]
    fn test_location_fallback() {
        let record = org(1, "Miami Food Bank", "Miami", "Florida", "United States");
        assert_eq!(record.location(), "Miami, Florida");
    }

    #[test]
    fn test_duplicate_ids() {
        let directory = Directory::from_records(vec![
            org(5, "A", "", "", ""),
            org(2, "B", "", "", ""),
            org(5, "C", "", "", ""),
        ]);
        assert_eq!(directory.duplicate_ids(), vec![5]);
        assert!(florida().duplicate_ids().is_empty());
    }

    #[test]
    fn test_bundled_dataset_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/organizations.json");
        let directory = Directory::load(&path).unwrap();
        assert!(!directory.is_empty());
        assert!(directory.duplicate_ids().is_empty());
        assert!(directory.find("1001").is_ok());
    }
}
