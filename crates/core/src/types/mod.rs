//! Core types for Volunteer Hub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use role::{RoleError, UserRole};
