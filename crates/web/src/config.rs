//! Web application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HUB_DATABASE_URL` - `PostgreSQL` connection string for the session store
//!   (falls back to `DATABASE_URL`)
//! - `HUB_BASE_URL` - Public URL for the site (used for OAuth redirects)
//! - `BACKEND_URL` - Managed backend project URL (e.g., `https://xyz.example.co`)
//! - `BACKEND_ANON_KEY` - Public API key used for auth calls
//! - `BACKEND_SERVICE_ROLE_KEY` - Server-side key used for data and admin calls
//!
//! ## Optional
//! - `HUB_HOST` - Bind address (default: 127.0.0.1)
//! - `HUB_PORT` - Listen port (default: 3000)
//! - `HUB_DIRECTORY_PATH` - Static organization dataset
//!   (default: `crates/web/data/organizations.json`)
//! - `HUB_DEBUG_ROUTES` - Mount `/api/debug/*` when `true` (default: false)
//! - `BACKEND_RETRY_ATTEMPTS` - Attempts per backend call (default: 3)
//! - `BACKEND_RETRY_BASE_MS` - Linear backoff base in milliseconds (default: 150)
//! - `BACKEND_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use crate::backend::RetryPolicy;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_DIRECTORY_PATH: &str = "crates/web/data/organizations.json";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: String,
    /// Managed backend configuration
    pub backend: BackendConfig,
    /// Path of the static external-organization dataset
    pub directory_path: PathBuf,
    /// Whether `/api/debug/*` routes are mounted
    pub debug_routes: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Managed backend (data + auth API) configuration.
///
/// Implements `Debug` manually to redact key fields.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL, without trailing slash
    pub url: String,
    /// Public key (safe to expose in browser)
    pub anon_key: SecretString,
    /// Service role key (server-side only, bypasses row level security)
    pub service_role_key: SecretString,
    /// Retry policy for transient failures
    pub retry: RetryPolicy,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .field("service_role_key", &"[REDACTED]")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = database_url_from_env()?;
        let host = get_parsed_or_default::<IpAddr>("HUB_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("HUB_PORT", "3000")?;
        let base_url = get_required_env("HUB_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        let backend = BackendConfig::from_env()?;
        let directory_path =
            PathBuf::from(get_env_or_default("HUB_DIRECTORY_PATH", DEFAULT_DIRECTORY_PATH));
        let debug_routes = get_parsed_or_default::<bool>("HUB_DEBUG_ROUTES", "false")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            backend,
            directory_path,
            debug_routes,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Absolute URL of the OAuth callback route.
    #[must_use]
    pub fn oauth_callback_url(&self) -> String {
        format!("{}/auth/callback", self.base_url)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    /// Load the backend section on its own (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or the service
    /// role key fails the strength check.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let url = get_required_env("BACKEND_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("BACKEND_URL".to_string(), e.to_string()))?;

        let retry = RetryPolicy {
            max_attempts: get_parsed_or_default::<u32>("BACKEND_RETRY_ATTEMPTS", "3")?.max(1),
            base_backoff_ms: get_parsed_or_default::<u64>("BACKEND_RETRY_BASE_MS", "150")?,
        };
        let timeout =
            Duration::from_secs(get_parsed_or_default::<u64>("BACKEND_TIMEOUT_SECS", "10")?);

        Ok(Self {
            url,
            anon_key: get_required_secret("BACKEND_ANON_KEY")?,
            service_role_key: get_validated_secret("BACKEND_SERVICE_ROLE_KEY")?,
            retry,
            timeout,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get the session store database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();

    if let Ok(value) = std::env::var("HUB_DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar("HUB_DATABASE_URL".to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default literal.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the backend."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
impl WebConfig {
    /// Configuration for unit tests; points at unroutable endpoints.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            database_url: SecretString::from("postgres://localhost/volunteer_hub_test"),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            backend: BackendConfig {
                url: "http://127.0.0.1:9".to_string(),
                anon_key: SecretString::from("anon"),
                service_role_key: SecretString::from("service"),
                retry: RetryPolicy {
                    max_attempts: 1,
                    base_backoff_ms: 0,
                },
                timeout: Duration::from_secs(1),
            },
            directory_path: PathBuf::from(DEFAULT_DIRECTORY_PATH),
            debug_routes: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-service-role-key", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.k3Zq8", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = WebConfig::for_tests();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_oauth_callback_url() {
        let config = WebConfig::for_tests();
        assert_eq!(
            config.oauth_callback_url(),
            "http://localhost:3000/auth/callback"
        );
        assert!(!config.is_secure());
    }

    #[test]
    fn test_backend_config_debug_redacts_keys() {
        let mut config = WebConfig::for_tests().backend;
        config.anon_key = SecretString::from("anon_key_value_visible_nowhere");
        config.service_role_key = SecretString::from("super_secret_service_role");

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("127.0.0.1:9"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("anon_key_value_visible_nowhere"));
        assert!(!debug_output.contains("super_secret_service_role"));
    }
}
