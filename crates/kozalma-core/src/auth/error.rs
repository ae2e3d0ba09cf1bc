use reqwest::StatusCode;
use thiserror::Error;

use crate::messages::Phrase;

/// Local input errors, raised before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Identifier is empty")]
    EmptyIdentifier,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Code must be exactly 6 digits")]
    InvalidCode,
}

impl ValidationError {
    pub fn phrase(&self) -> Phrase {
        match self {
            ValidationError::InvalidCode => Phrase::InvalidCodeFormat,
            _ => Phrase::InvalidIdentifier,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Secure storage error: {0}")]
    Backend(String),
}

impl From<keyring::Error> for StorageError {
    fn from(err: keyring::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid or expired code")]
    InvalidOrExpiredCode,

    #[error("Auth service unavailable")]
    ServiceUnavailable,

    #[error("Auth request failed with status {0}")]
    Other(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to store credentials: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Status mapping for `POST /auth/request-code`
    pub fn from_request_code_status(status: StatusCode) -> Self {
        match status.as_u16() {
            503 => AuthError::ServiceUnavailable,
            other => AuthError::Other(other),
        }
    }

    /// Status mapping for `POST /auth/verify-code`
    pub fn from_verify_code_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 => AuthError::InvalidOrExpiredCode,
            other => AuthError::Other(other),
        }
    }

    pub fn phrase(&self) -> Phrase {
        match self {
            AuthError::Validation(e) => e.phrase(),
            AuthError::InvalidOrExpiredCode => Phrase::InvalidCode,
            AuthError::ServiceUnavailable => Phrase::ServiceUnavailable,
            AuthError::Network(_) => Phrase::NetworkError,
            AuthError::Other(_) | AuthError::InvalidResponse(_) | AuthError::Storage(_) => {
                Phrase::ServiceUnavailable
            }
        }
    }
}
