//! Error types for the relay service

use crate::backend::BackendError;
use axum::http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelayError>;

/// Reported when no upstream API key is available
pub const MISSING_API_KEY: &str = "API key not configured in environment variables.";

/// Every failure a relay request can end in
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Upstream API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream API timed out after {0} ms")]
    Timeout(u64),

    #[error("Malformed upstream response: {0}")]
    MalformedUpstream(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        RelayError::Validation(message.into())
    }

    /// HTTP status reported to the caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Configuration(_) | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::Upstream { .. } | RelayError::MalformedUpstream(_) => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// The caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayError::Timeout(_) | RelayError::Upstream { .. })
    }
}

impl From<BackendError> for RelayError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::MissingApiKey => RelayError::Configuration(MISSING_API_KEY.to_string()),
            BackendError::Upstream { status, body } => RelayError::Upstream {
                status: status.as_u16(),
                message: body,
            },
            BackendError::Timeout(ms) => RelayError::Timeout(ms),
            BackendError::InvalidResponse(msg) => RelayError::MalformedUpstream(msg),
            BackendError::RequestFailed(msg) => RelayError::Upstream {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                message: msg,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RelayError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::Configuration("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::Upstream { status: 529, message: "overloaded".into() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(RelayError::Timeout(30_000).status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            RelayError::MalformedUpstream("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_backend_errors_convert() {
        let err: RelayError = BackendError::Upstream {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "bad key".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Upstream API error (401): bad key");
        assert!(err.is_retryable());

        let err: RelayError = BackendError::Timeout(100).into();
        assert!(matches!(err, RelayError::Timeout(100)));

        let err: RelayError = BackendError::MissingApiKey.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_retryable());
    }
}
