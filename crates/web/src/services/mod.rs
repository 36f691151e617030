//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Sign-up, sign-in, OAuth and sign-out against the auth provider
//! - `organizations` - Organization registration (validation, duplicate check)
//! - `profiles` - Profile provisioning and reconciliation
//!
//! Services that write to the backend are generic over small store traits so
//! they can be exercised with in-memory fakes.

pub mod auth;
pub mod organizations;
pub mod profiles;
