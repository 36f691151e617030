//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. JSON handlers return `Result<T, AppError>`; the
//! body is always `{"success": false, "error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendError;
use crate::directory::LookupError;
use crate::services::organizations::RegistrationError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Form or payload failed validation.
    #[error("{0}")]
    Validation(String),

    /// Malformed request (e.g. a non-numeric id).
    #[error("{0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("{0}")]
    Conflict(String),

    /// Managed backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(e) => Self::Validation(e.to_string()),
            RegistrationError::DuplicateName(_) => Self::Conflict(err.to_string()),
            RegistrationError::Backend(e) => Self::Backend(e),
        }
    }
}

impl From<LookupError> for AppError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::InvalidId => Self::BadRequest(err.to_string()),
            LookupError::NotFound => Self::NotFound(err.to_string()),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            // Backend messages are passed through (e.g. constraint violations)
            Self::Backend(err) => err.message(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Backend(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "success": false,
            "error": self.client_message(),
        });

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in user.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("organizations", "Submitted registration", Some(&[("name", "Ocean Guardians")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::organizations::ValidationError;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let (status, body) = body_json(LookupError::InvalidId.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid ID format");
        assert_eq!(body["success"], false);

        let (status, body) = body_json(LookupError::NotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Organization not found");
    }

    #[tokio::test]
    async fn test_registration_errors() {
        let err = RegistrationError::Validation(ValidationError {
            fields: vec!["email"],
        });
        let (status, body) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid form data. Please check your inputs.");

        let err = RegistrationError::DuplicateName("Ocean Guardians".to_string());
        let (status, body) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body["error"],
            "An organization named \"Ocean Guardians\" already exists."
        );
    }

    #[tokio::test]
    async fn test_backend_message_passes_through() {
        let err = AppError::Backend(BackendError::Api {
            status: 400,
            message: "value too long for type character varying(255)".to_string(),
            code: Some("22001".to_string()),
        });
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "value too long for type character varying(255)");
    }

    #[tokio::test]
    async fn test_registration_backend_failure_is_bad_gateway() {
        let err = RegistrationError::Backend(BackendError::Api {
            status: 409,
            message: "insert or update on table \"organizations\" violates foreign key constraint"
                .to_string(),
            code: Some("23503".to_string()),
        });
        let (status, body) = body_json(err.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["success"], false);
    }
}
