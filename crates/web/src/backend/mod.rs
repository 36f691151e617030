//! Managed backend gateway.
//!
//! # Architecture
//!
//! - The backend exposes a PostgREST-style data API under `/rest/v1` and a
//!   GoTrue-style auth API under `/auth/v1`
//! - The backend is the source of truth for users, organizations and
//!   opportunities; nothing is synced or cached locally
//! - Every call goes through [`BackendClient::send`], which translates error
//!   bodies into [`BackendError`] and retries transient failures
//!
//! # Keys
//!
//! Data and admin calls use the service role key. Sign-up, sign-in, token
//! exchange and logout use the public anon key, like a browser client would.
//!
//! # Example
//!
//! ```rust,ignore
//! use volunteer_hub_web::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let opportunities = client.list_opportunities(Some(3)).await?;
//! ```

mod auth;
mod client;
mod rest;
mod retry;
pub mod types;

pub use client::BackendClient;
pub use retry::RetryPolicy;
pub use types::*;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// `PostgreSQL` error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur when calling the managed backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    /// Whether a read may be retried: connect/timeout failures, 429 and 5xx.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Parse(_) | Self::Url(_) => false,
        }
    }

    /// Whether a write may be retried.
    ///
    /// Only failures where the request never reached the backend qualify, so a
    /// retried insert cannot land twice.
    #[must_use]
    pub fn is_write_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect(),
            Self::RateLimited(_) => true,
            Self::Api { .. } | Self::Parse(_) | Self::Url(_) => false,
        }
    }

    /// Whether the backend rejected an insert because the row already exists.
    ///
    /// The data API also answers 409 for foreign key violations, so the status
    /// alone only counts when no error code came back.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Api {
                code: Some(code), ..
            } => code == UNIQUE_VIOLATION,
            Self::Api { status, code: None, .. } => *status == StatusCode::CONFLICT.as_u16(),
            _ => false,
        }
    }

    /// HTTP status returned by the backend, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Message suitable for passing through to a form result.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::RateLimited(_) => "Too many requests. Please try again shortly.".to_string(),
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => {
                "The service is temporarily unavailable.".to_string()
            }
        }
    }
}

/// Error body shapes returned by the data and auth APIs.
///
/// PostgREST sends `{code, message, details, hint}`; the auth API sends
/// either `{code, error_code, msg}` or `{error, error_description}`.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ApiErrorBody {
    fn into_error(self, status: StatusCode, raw: &str) -> BackendError {
        let code = match self.code {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => self.error_code.clone(),
        };
        let message = self
            .message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                let snippet: String = raw.chars().take(200).collect();
                if snippet.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    snippet
                }
            });

        BackendError::Api {
            status: status.as_u16(),
            message,
            code,
        }
    }
}

/// Translate a non-success response body into a [`BackendError`].
fn error_from_body(status: StatusCode, body: &str) -> BackendError {
    serde_json::from_str::<ApiErrorBody>(body)
        .unwrap_or_default()
        .into_error(status, body)
}
