//! Volunteer Hub web library.
//!
//! This crate provides the site as a library so the binary, the CLI and the
//! tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
