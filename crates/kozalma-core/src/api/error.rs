use thiserror::Error;

use crate::messages::Phrase;

/// Result of every backend call: `Ok(payload)`, `Err(Unauthorized)` or another failure.
pub type ApiCallOutcome<T> = Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            code => ApiError::Status {
                status: code,
                body: Self::truncate_body(body),
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn phrase(&self) -> Phrase {
        match self {
            ApiError::Unauthorized => Phrase::SessionExpired,
            ApiError::Network(_) => Phrase::NetworkError,
            ApiError::Status { status: 502..=504, .. } => Phrase::ServiceUnavailable,
            ApiError::Status { .. } | ApiError::InvalidResponse(_) => Phrase::ScanFailed,
        }
    }
}
