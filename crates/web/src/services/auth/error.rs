//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] volunteer_hub_core::EmailError),

    /// Password shorter than the provider accepts.
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The provider refused the request (e.g. email already registered).
    #[error("{0}")]
    Rejected(String),

    /// Unsupported OAuth provider in the URL.
    #[error("unknown OAuth provider: {0}")]
    UnknownProvider(String),

    /// Backend unreachable or misbehaving.
    #[error("backend error: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err.status() {
            Some(status) if (400..500).contains(&status) && status != 429 => {
                Self::Rejected(err.message())
            }
            _ => Self::Backend(err),
        }
    }
}

impl AuthError {
    /// Message shown inline on the login and registration pages.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address.".to_string(),
            Self::WeakPassword(min) => format!("Password must be at least {min} characters."),
            Self::InvalidCredentials => "Invalid email or password.".to_string(),
            Self::Rejected(message) => message.clone(),
            Self::UnknownProvider(_) => "That sign-in method is not supported.".to_string(),
            Self::Backend(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}
