//! Newtype IDs for type-safe entity references.
//!
//! Every persisted entity in the managed backend is keyed by a UUID. Use the
//! `define_id!` macro to create wrappers that prevent accidentally mixing IDs
//! from different entity types.

/// Macro to define a type-safe UUID wrapper.
///
/// Creates a newtype wrapper around `uuid::Uuid` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `generate()`, `as_uuid()`
/// - `Display`, `FromStr`, and `From<Uuid>` implementations
///
/// # Example
///
/// ```rust
/// # use volunteer_hub_core::define_id;
/// define_id!(ProfileId);
/// define_id!(OrganizationId);
///
/// let profile_id = ProfileId::generate();
/// let organization_id = OrganizationId::generate();
///
/// // These are different types, so this won't compile:
/// // let _: ProfileId = organization_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(::uuid::Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: ::uuid::Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random (v4) ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4())
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> ::uuid::Uuid {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::uuid::Error;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                ::uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl From<::uuid::Uuid> for $name {
            fn from(id: ::uuid::Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for ::uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Profile IDs are the auth provider's user IDs; the backend owns both.
define_id!(ProfileId);
define_id!(OrganizationId);
define_id!(OpportunityId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(OrganizationId::generate(), OrganizationId::generate());
    }

    #[test]
    fn test_from_str_and_display() {
        let raw = "0b7c7c53-5a55-4c1f-9d3f-6f0c3b9f2a11";
        let id: ProfileId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("not-a-uuid".parse::<OpportunityId>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id: OrganizationId = "0b7c7c53-5a55-4c1f-9d3f-6f0c3b9f2a11".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0b7c7c53-5a55-4c1f-9d3f-6f0c3b9f2a11\"");
    }
}
