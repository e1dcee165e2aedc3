/*
[INPUT]:  Error sources (HTTP, API, serialization, credentials, request validation)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - REST error type for the crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

use crate::types::ApiErrorBody;

/// Main error type for the REST client
#[derive(Error, Debug)]
pub enum AlpacaError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error (status {status}, code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Missing or conflicting credentials
    #[error("Invalid credentials: {0}")]
    Credentials(String),

    /// Request rejected before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AlpacaError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            AlpacaError::Http(err) => err.is_timeout() || err.is_connect(),
            AlpacaError::Api { status, .. } => matches!(*status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        match self {
            AlpacaError::Api { status, .. } => matches!(*status, 401 | 403),
            AlpacaError::Credentials(_) => true,
            _ => false,
        }
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            AlpacaError::Api { status, .. } => Some(*status),
            AlpacaError::Http(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    /// Create an API error from status code and raw response body
    pub fn api_error(status: StatusCode, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => (parsed.code, parsed.message),
            Err(_) => (None, body.trim().to_string()),
        };
        let message = if message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        } else {
            message
        };

        AlpacaError::Api {
            status: status.as_u16(),
            code,
            message,
        }
    }
}

/// Result type alias for REST operations
pub type Result<T> = std::result::Result<T, AlpacaError>;
