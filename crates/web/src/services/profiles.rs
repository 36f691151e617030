//! Profile provisioning and reconciliation.
//!
//! Every auth identity should have exactly one row in the `users` table.
//! [`ensure_profile`] is the only way a profile gets created during normal
//! operation (sign-up, sign-in, OAuth callback); [`reconcile`] backfills
//! identities that slipped through, using the same [`ProfileSeed`] defaults.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use volunteer_hub_core::{ProfileId, UserRole};

use crate::backend::{AuthIdentity, BackendError, IdentityMetadata};
use crate::models::Profile;

/// Name used when an identity has neither a display name nor an email.
pub const FALLBACK_NAME: &str = "User";

/// Read/write access to the `users` table.
pub trait ProfileStore: Send + Sync {
    /// All profile rows.
    fn list_profiles(&self) -> impl Future<Output = Result<Vec<Profile>, BackendError>> + Send;

    /// The profile with the given id, if any.
    fn find_profile(
        &self,
        id: ProfileId,
    ) -> impl Future<Output = Result<Option<Profile>, BackendError>> + Send;

    /// Insert a new profile row.
    fn insert_profile(
        &self,
        profile: &Profile,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Read access to the auth provider's identity table.
pub trait IdentityDirectory: Send + Sync {
    /// Every identity known to the auth provider.
    fn list_identities(
        &self,
    ) -> impl Future<Output = Result<Vec<AuthIdentity>, BackendError>> + Send;
}

/// Display name for an identity: metadata name, else the email's local part,
/// else [`FALLBACK_NAME`].
#[must_use]
pub fn default_name(metadata_name: Option<&str>, email: Option<&str>) -> String {
    metadata_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| {
            email
                .and_then(|email| email.split('@').next())
                .filter(|local| !local.is_empty())
        })
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

/// Role for an identity: the metadata role when it is a known role, else
/// volunteer.
#[must_use]
pub fn default_role(metadata_role: Option<&str>) -> UserRole {
    metadata_role
        .and_then(|role| role.parse().ok())
        .unwrap_or_default()
}

/// Everything needed to create a profile for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSeed {
    pub id: ProfileId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl ProfileSeed {
    /// Derive a seed from an identity's email and metadata.
    #[must_use]
    pub fn from_identity(identity: &AuthIdentity) -> Self {
        let metadata = &identity.user_metadata;
        Self {
            id: identity.id,
            email: identity.email.clone().unwrap_or_default(),
            name: default_name(metadata.name.as_deref(), identity.email.as_deref()),
            role: default_role(metadata.role.as_deref()),
            created_at: identity.created_at,
        }
    }

    fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            name: self.name,
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Result of [`ensure_profile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// A profile already existed and was left untouched.
    Existing(Profile),
    /// A profile was inserted from the seed.
    Created(Profile),
}

impl EnsureOutcome {
    /// The profile, whether found or created.
    #[must_use]
    pub fn into_profile(self) -> Profile {
        match self {
            Self::Existing(profile) | Self::Created(profile) => profile,
        }
    }

    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Make sure a profile exists for the seed's identity.
///
/// Idempotent: an existing row is returned unchanged, and a unique violation
/// from a concurrent insert is treated as "already present".
///
/// # Errors
///
/// Returns an error if the lookup fails or the insert fails for any reason
/// other than the row already existing.
#[instrument(skip(store, seed), fields(profile_id = %seed.id))]
pub async fn ensure_profile<S: ProfileStore>(
    store: &S,
    seed: ProfileSeed,
) -> Result<EnsureOutcome, BackendError> {
    if let Some(existing) = store.find_profile(seed.id).await? {
        return Ok(EnsureOutcome::Existing(existing));
    }

    let profile = seed.into_profile();
    match store.insert_profile(&profile).await {
        Ok(()) => {
            info!(role = %profile.role, "Created profile");
            Ok(EnsureOutcome::Created(profile))
        }
        Err(e) if e.is_unique_violation() => match store.find_profile(profile.id).await? {
            Some(existing) => Ok(EnsureOutcome::Existing(existing)),
            None => Err(e),
        },
        Err(e) => Err(e),
    }
}

/// Identities with no profile row, in identity order.
#[must_use]
pub fn missing_identities<'a>(
    identities: &'a [AuthIdentity],
    profiles: &[Profile],
) -> Vec<&'a AuthIdentity> {
    let present: HashSet<ProfileId> = profiles.iter().map(|p| p.id).collect();
    identities
        .iter()
        .filter(|identity| !present.contains(&identity.id))
        .collect()
}

/// Identity summary used in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentitySummary {
    pub id: ProfileId,
    pub email: Option<String>,
    pub metadata: IdentityMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl IdentitySummary {
    fn of(identity: &AuthIdentity) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            metadata: identity.user_metadata.clone(),
            created_at: None,
        }
    }

    fn with_created_at(identity: &AuthIdentity) -> Self {
        Self {
            created_at: Some(identity.created_at),
            ..Self::of(identity)
        }
    }
}

/// Outcome for one identity during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileDetail {
    pub user: IdentitySummary,
    pub success: bool,
    pub error: Option<String>,
}

/// Summary of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub total: usize,
    pub fixed: usize,
    pub failed: usize,
    pub details: Vec<ReconcileDetail>,
}

/// Insert a profile for every identity that lacks one.
///
/// Inserts run one at a time and independently: a failed insert is recorded
/// in the report and the remaining identities are still processed.
#[instrument(skip_all, fields(identities = identities.len(), profiles = profiles.len()))]
pub async fn reconcile<S: ProfileStore>(
    store: &S,
    identities: &[AuthIdentity],
    profiles: &[Profile],
) -> ReconcileReport {
    let missing = missing_identities(identities, profiles);
    let mut report = ReconcileReport {
        total: missing.len(),
        ..ReconcileReport::default()
    };

    for identity in missing {
        let profile = ProfileSeed::from_identity(identity).into_profile();
        let error = match store.insert_profile(&profile).await {
            Ok(()) => None,
            // Created concurrently; the identity is no longer missing.
            Err(e) if e.is_unique_violation() => None,
            Err(e) => {
                warn!(profile_id = %identity.id, error = %e, "Failed to backfill profile");
                Some(e.message())
            }
        };

        if error.is_none() {
            report.fixed += 1;
        } else {
            report.failed += 1;
        }
        report.details.push(ReconcileDetail {
            user: IdentitySummary::of(identity),
            success: error.is_none(),
            error,
        });
    }

    info!(
        total = report.total,
        fixed = report.fixed,
        failed = report.failed,
        "Profile reconciliation finished"
    );
    report
}

/// Fetch identities and profiles, then [`reconcile`] them.
///
/// # Errors
///
/// Returns an error if either listing fails. Individual insert failures are
/// reported in the result instead.
pub async fn reconcile_all<S>(store: &S) -> Result<ReconcileReport, BackendError>
where
    S: ProfileStore + IdentityDirectory,
{
    let identities = store.list_identities().await?;
    let profiles = store.list_profiles().await?;
    Ok(reconcile(store, &identities, &profiles).await)
}

/// Side-by-side view of identities and profiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserComparison {
    pub auth_users: Vec<IdentitySummary>,
    pub profiles: Vec<Profile>,
    pub auth_count: usize,
    pub profile_count: usize,
    pub missing_users: Vec<IdentitySummary>,
}

/// Build a [`UserComparison`] from already-fetched rows.
#[must_use]
pub fn compare(identities: &[AuthIdentity], profiles: Vec<Profile>) -> UserComparison {
    let missing_users = missing_identities(identities, &profiles)
        .into_iter()
        .map(IdentitySummary::of)
        .collect();
    UserComparison {
        auth_users: identities.iter().map(IdentitySummary::with_created_at).collect(),
        auth_count: identities.len(),
        profile_count: profiles.len(),
        profiles,
        missing_users,
    }
}

/// Fetch identities and profiles and [`compare`] them.
///
/// # Errors
///
/// Returns an error if either listing fails.
pub async fn compare_all<S>(store: &S) -> Result<UserComparison, BackendError>
where
    S: ProfileStore + IdentityDirectory,
{
    let identities = store.list_identities().await?;
    let profiles = store.list_profiles().await?;
    Ok(compare(&identities, profiles))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    /// In-memory `users` table.
    #[derive(Default)]
    pub(crate) struct FakeProfiles {
        pub rows: Mutex<Vec<Profile>>,
        pub identities: Vec<AuthIdentity>,
        /// Inserts for these ids fail with a backend error.
        pub failing: HashSet<ProfileId>,
        /// Another writer inserts the row first, so the insert reports a
        /// unique violation.
        pub conflict_on_insert: bool,
        /// Inserts for these ids fail with a foreign key violation.
        pub orphaned: HashSet<ProfileId>,
    }

    impl ProfileStore for FakeProfiles {
        async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn find_profile(&self, id: ProfileId) -> Result<Option<Profile>, BackendError> {
            Ok(self.rows.lock().unwrap().iter().find(|p| p.id == id).cloned())
        }

        async fn insert_profile(&self, profile: &Profile) -> Result<(), BackendError> {
            if self.failing.contains(&profile.id) {
                return Err(BackendError::Api {
                    status: 400,
                    message: "null value in column \"email\"".to_string(),
                    code: Some("23502".to_string()),
                });
            }
            if self.orphaned.contains(&profile.id) {
                return Err(BackendError::Api {
                    status: 409,
                    message: "insert or update on table \"users\" violates foreign key constraint"
                        .to_string(),
                    code: Some("23503".to_string()),
                });
            }
            let mut rows = self.rows.lock().unwrap();
            if self.conflict_on_insert && !rows.iter().any(|p| p.id == profile.id) {
                rows.push(profile.clone());
                return Err(BackendError::Api {
                    status: 409,
                    message: "duplicate key value violates unique constraint".to_string(),
                    code: Some("23505".to_string()),
                });
            }
            if rows.iter().any(|p| p.id == profile.id) {
                return Err(BackendError::Api {
                    status: 409,
                    message: "duplicate key value violates unique constraint".to_string(),
                    code: Some("23505".to_string()),
                });
            }
            rows.push(profile.clone());
            Ok(())
        }
    }

    impl IdentityDirectory for FakeProfiles {
        async fn list_identities(&self) -> Result<Vec<AuthIdentity>, BackendError> {
            Ok(self.identities.clone())
        }
    }

    pub(crate) fn identity(email: Option<&str>, name: Option<&str>, role: Option<&str>) -> AuthIdentity {
        AuthIdentity {
            id: ProfileId::generate(),
            email: email.map(str::to_string),
            user_metadata: IdentityMetadata {
                name: name.map(str::to_string),
                role: role.map(str::to_string),
                extra: serde_json::Map::new(),
            },
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_default_name_order() {
        assert_eq!(default_name(Some("Sam Rivera"), Some("sam@example.com")), "Sam Rivera");
        assert_eq!(default_name(Some("   "), Some("sam@example.com")), "sam");
        assert_eq!(default_name(None, Some("sam@example.com")), "sam");
        assert_eq!(default_name(None, None), FALLBACK_NAME);
        assert_eq!(default_name(None, Some("@example.com")), FALLBACK_NAME);
    }

    #[test]
    fn test_default_role() {
        assert_eq!(default_role(Some("organization")), UserRole::Organization);
        assert_eq!(default_role(Some("admin")), UserRole::Volunteer);
        assert_eq!(default_role(None), UserRole::Volunteer);
    }

    #[test]
    fn test_seed_from_identity() {
        let identity = identity(Some("river@example.com"), None, Some("organization"));
        let seed = ProfileSeed::from_identity(&identity);
        assert_eq!(seed.id, identity.id);
        assert_eq!(seed.name, "river");
        assert_eq!(seed.role, UserRole::Organization);
        assert_eq!(seed.created_at, identity.created_at);
    }

    #[tokio::test]
    async fn test_ensure_profile_creates_then_finds() {
        let store = FakeProfiles::default();
        let seed = ProfileSeed::from_identity(&identity(Some("a@example.com"), Some("Ana"), None));

        let first = ensure_profile(&store, seed.clone()).await.unwrap();
        assert!(first.was_created());

        let second = ensure_profile(&store, seed).await.unwrap();
        assert!(!second.was_created());
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_keeps_existing_row() {
        let store = FakeProfiles::default();
        let identity = identity(Some("a@example.com"), Some("Ana"), Some("organization"));
        let mut seed = ProfileSeed::from_identity(&identity);
        ensure_profile(&store, seed.clone()).await.unwrap();

        seed.name = "Someone Else".to_string();
        let outcome = ensure_profile(&store, seed).await.unwrap();
        assert_eq!(outcome.into_profile().name, "Ana");
    }

    #[tokio::test]
    async fn test_ensure_profile_treats_conflict_as_present() {
        let store = FakeProfiles {
            conflict_on_insert: true,
            ..FakeProfiles::default()
        };
        let seed = ProfileSeed::from_identity(&identity(Some("a@example.com"), None, None));
        let outcome = ensure_profile(&store, seed).await.unwrap();
        assert!(!outcome.was_created());
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_reports_foreign_key_conflict() {
        let identity = identity(Some("gone@example.com"), None, None);
        let store = FakeProfiles {
            orphaned: HashSet::from([identity.id]),
            ..FakeProfiles::default()
        };
        let result = ensure_profile(&store, ProfileSeed::from_identity(&identity)).await;

        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert!(!err.is_unique_violation());
        assert!(store.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_profile_propagates_other_errors() {
        let identity = identity(Some("a@example.com"), None, None);
        let store = FakeProfiles {
            failing: HashSet::from([identity.id]),
            ..FakeProfiles::default()
        };
        let result = ensure_profile(&store, ProfileSeed::from_identity(&identity)).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_identities() {
        let present = identity(Some("a@example.com"), None, None);
        let absent = identity(Some("b@example.com"), None, None);
        let profiles = vec![ProfileSeed::from_identity(&present).into_profile()];
        let identities = vec![present, absent.clone()];

        let missing = missing_identities(&identities, &profiles);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, absent.id);
    }

    #[tokio::test]
    async fn test_reconcile_isolates_failures() {
        let ok_one = identity(Some("one@example.com"), Some("One"), None);
        let broken = identity(None, None, None);
        let ok_two = identity(Some("two@example.com"), None, Some("organization"));
        let store = FakeProfiles {
            failing: HashSet::from([broken.id]),
            ..FakeProfiles::default()
        };
        let identities = vec![ok_one, broken.clone(), ok_two.clone()];

        let report = reconcile(&store, &identities, &[]).await;

        assert_eq!(report.total, 3);
        assert_eq!(report.fixed, 2);
        assert_eq!(report.failed, 1);
        let failed = report.details.iter().find(|d| !d.success).unwrap();
        assert_eq!(failed.user.id, broken.id);
        assert!(failed.error.is_some());

        let rows = store.rows.lock().unwrap();
        let two = rows.iter().find(|p| p.id == ok_two.id).unwrap();
        assert_eq!(two.name, "two");
        assert_eq!(two.role, UserRole::Organization);
    }

    #[tokio::test]
    async fn test_reconcile_counts_foreign_key_conflict_as_failure() {
        let kept = identity(Some("kept@example.com"), None, None);
        let deleted = identity(Some("deleted@example.com"), None, None);
        let store = FakeProfiles {
            orphaned: HashSet::from([deleted.id]),
            ..FakeProfiles::default()
        };

        let report = reconcile(&store, &[kept, deleted.clone()], &[]).await;

        assert_eq!(report.fixed, 1);
        assert_eq!(report.failed, 1);
        let failed = report.details.iter().find(|d| !d.success).unwrap();
        assert_eq!(failed.user.id, deleted.id);
        assert!(failed.error.as_deref().unwrap().contains("foreign key"));
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let store = FakeProfiles {
            identities: vec![
                identity(Some("one@example.com"), None, None),
                identity(Some("two@example.com"), None, None),
            ],
            ..FakeProfiles::default()
        };

        let first = reconcile_all(&store).await.unwrap();
        assert_eq!(first.fixed, 2);

        let second = reconcile_all(&store).await.unwrap();
        assert_eq!(second.total, 0);
        assert!(second.details.is_empty());
        assert_eq!(store.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_compare_counts() {
        let store = FakeProfiles {
            identities: vec![
                identity(Some("one@example.com"), None, None),
                identity(Some("two@example.com"), None, None),
            ],
            ..FakeProfiles::default()
        };
        let seed = ProfileSeed::from_identity(&store.identities[0]);
        ensure_profile(&store, seed).await.unwrap();

        let comparison = compare_all(&store).await.unwrap();
        assert_eq!(comparison.auth_count, 2);
        assert_eq!(comparison.profile_count, 1);
        assert_eq!(comparison.missing_users.len(), 1);

        let json = serde_json::to_value(&comparison).unwrap();
        assert!(json.get("missingUsers").is_some());
        assert!(json.get("authCount").is_some());
    }
}
