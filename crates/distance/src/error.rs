//! Error types for the distance matrix client

use gosend_rates::DistanceError;
use thiserror::Error;

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Distance matrix client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Response body was not valid JSON
    #[error("Error occurred while decoding API response: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP status other than success
    #[error("API error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The API answered, but not with a usable distance
    #[error(transparent)]
    Distance(#[from] DistanceError),

    /// Circuit breaker is open
    #[error("Circuit breaker is open - service temporarily unavailable")]
    CircuitOpen,

    /// All retry attempts exhausted
    #[error("All {attempts} retry attempts failed: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last error message
        last_error: String,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::ApiResponse { status, .. } => *status >= 500 || *status == 429,
            // UNKNOWN_ERROR and friends are answered with HTTP 200
            Self::Distance(DistanceError::Api(message)) => message.starts_with("UNKNOWN_ERROR"),
            Self::Distance(_) | Self::CircuitOpen => false,
            Self::Config(_)
            | Self::Json(_)
            | Self::InvalidUrl(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }
}

impl From<ApiError> for DistanceError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Distance(inner) => inner,
            ApiError::Json(e) => {
                DistanceError::Api(format!("Error occurred while decoding API response: {e}"))
            }
            ApiError::ApiResponse { status, message } => {
                DistanceError::Api(format!("HTTP {status}: {message}"))
            }
            other => DistanceError::Unavailable(other.to_string()),
        }
    }
}
