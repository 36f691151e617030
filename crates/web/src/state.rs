//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::backend::{BackendClient, BackendError};
use crate::config::WebConfig;
use crate::directory::Directory;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Everything in it is read-only
/// after startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    pool: PgPool,
    backend: BackendClient,
    directory: Directory,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Web configuration
    /// * `pool` - `PostgreSQL` connection pool (session store)
    /// * `directory` - Loaded external organization dataset
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built.
    pub fn new(config: WebConfig, pool: PgPool, directory: Directory) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        Ok(Self::from_parts(config, pool, backend, directory))
    }

    /// Assemble state from already-built parts.
    #[must_use]
    pub fn from_parts(
        config: WebConfig,
        pool: PgPool,
        backend: BackendClient,
        directory: Directory,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                backend,
                directory,
            }),
        }
    }

    /// Get a reference to the web configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the managed backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the external organization directory.
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.inner.directory
    }
}

#[cfg(test)]
impl AppState {
    /// State for router tests: lazy pool, unreachable backend.
    ///
    /// Must be called inside a Tokio runtime.
    #[allow(clippy::unwrap_used)]
    pub(crate) fn for_tests(directory: Directory) -> Self {
        let config = WebConfig::for_tests();
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/volunteer_hub_test")
            .unwrap();
        let backend = BackendClient::new(&config.backend).unwrap();
        Self::from_parts(config, pool, backend, directory)
    }
}
