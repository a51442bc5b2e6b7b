//! Error types for backend API operations.

use thiserror::Error;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The bearer credential was rejected (HTTP 401).
    ///
    /// Never retried locally: a sweep aborts on this and resumes only after
    /// the auth collaborator has refreshed the credential.
    #[error("Unauthorized: credential rejected by the backend")]
    Unauthorized,

    /// The backend answered with a non-success status other than 401.
    #[error("Request failed with status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        message: String,
    },

    /// Transport-level failure: timeout, refused connection, DNS.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ApiError {
    /// Whether a later retry can plausibly succeed without intervention.
    ///
    /// Timeouts, connection failures and 5xx responses are transient;
    /// authorization failures and other 4xx responses are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Unauthorized | Self::Decode(_) => false,
        }
    }
}

/// Result type alias using our error type.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(
            ApiError::Status {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !ApiError::Status {
                status: 422,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!ApiError::Unauthorized.is_transient());
    }
}
