//! HTTP client for the managed backend.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::{BackendError, RetryPolicy, error_from_body};
use crate::config::BackendConfig;

/// Which retry rule applies to a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    /// Idempotent: retried on connect/timeout errors, 429 and 5xx.
    Read,
    /// Not idempotent: retried only when the request never arrived.
    Write,
}

/// Which key a request is authorized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyKind {
    Anon,
    ServiceRole,
}

/// Client for the managed backend's data and auth APIs.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    http: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    service_role_key: SecretString,
    retry: RetryPolicy,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        // Trailing slash so that `join` appends rather than replaces.
        let base_url = Url::parse(&format!("{}/", config.url.trim_end_matches('/')))?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                http,
                base_url,
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
                retry: config.retry,
            }),
        })
    }

    /// Build an absolute URL for a path below the project root.
    pub(crate) fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.join(path.trim_start_matches('/'))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Start a request carrying the `apikey` header and a bearer token.
    ///
    /// When `bearer` is `None` the key itself is sent as the bearer token.
    pub(crate) fn request(
        &self,
        method: Method,
        url: Url,
        key: KeyKind,
        bearer: Option<&str>,
    ) -> RequestBuilder {
        let key = match key {
            KeyKind::Anon => self.inner.anon_key.expose_secret(),
            KeyKind::ServiceRole => self.inner.service_role_key.expose_secret(),
        };
        self.inner
            .http
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(bearer.unwrap_or(key))
    }

    /// Send a request, retrying per the configured policy.
    ///
    /// `build` is called once per attempt. Returns the successful response;
    /// any non-success status is translated into a [`BackendError`].
    pub(crate) async fn send<F>(&self, kind: CallKind, build: F) -> Result<Response, BackendError>
    where
        F: Fn() -> RequestBuilder,
    {
        let policy = self.inner.retry;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let result = match build().send().await {
                Ok(response) => check_status(response).await,
                Err(e) => Err(BackendError::Http(e)),
            };

            match result {
                Ok(response) => return Ok(response),
                Err(err) => {
                    let retryable = match kind {
                        CallKind::Read => err.is_transient(),
                        CallKind::Write => err.is_write_retryable(),
                    };
                    if !retryable || !policy.allows_another(attempt) {
                        return Err(err);
                    }

                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Backend call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Send a request and decode the JSON body.
    pub(crate) async fn send_json<T, F>(&self, kind: CallKind, build: F) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let response = self.send(kind, build).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }
}

/// Turn non-success statuses into errors.
async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(BackendError::RateLimited(retry_after));
    }

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "Backend returned non-success status"
    );
    Err(error_from_body(status, &body))
}
