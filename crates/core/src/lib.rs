//! Volunteer Hub Core - Shared types library.
//!
//! This crate provides common types used across all Volunteer Hub components:
//! - `web` - Public marketplace site (pages, JSON API, auth glue)
//! - `cli` - Command-line tools for migrations and user reconciliation
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and user roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
