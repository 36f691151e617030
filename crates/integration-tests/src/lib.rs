//! Integration tests for Volunteer Hub.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the site against a backend
//! cargo run -p volunteer-hub-web
//!
//! # Run the ignored integration tests
//! cargo test -p volunteer-hub-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `HUB_TEST_BASE_URL` - site under test (default `http://localhost:3000`)
//! - `HUB_TEST_EMAIL` / `HUB_TEST_PASSWORD` - an existing account for the
//!   authenticated flows

use reqwest::Client;
use reqwest::redirect::Policy;

/// Base URL of the running site.
#[must_use]
pub fn base_url() -> String {
    std::env::var("HUB_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Client that keeps cookies and does not follow redirects, so tests can
/// assert on `Location`.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Credentials of a pre-existing test account, if configured.
#[must_use]
pub fn test_credentials() -> Option<(String, String)> {
    let email = std::env::var("HUB_TEST_EMAIL").ok()?;
    let password = std::env::var("HUB_TEST_PASSWORD").ok()?;
    Some((email, password))
}
