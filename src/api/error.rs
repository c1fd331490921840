//! API error types for the venue REST clients.

use thiserror::Error;

use crate::auth::AuthError;

/// API-specific error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Method name outside the venue's registries
    #[error("Method {method} does not exist. Can only be one of: {}", .valid.join(", "))]
    InvalidMethod { method: String, valid: Vec<String> },

    /// Missing credentials or unusable secret
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The venue kept reporting an error until the retry schedule ran out
    #[error("{error}\n-> URL: {url}\n-> Params: {params}\n-> Attempts: {attempts}")]
    Connection {
        attempts: u32,
        error: String,
        url: String,
        params: String,
    },

    /// HTTP status outside the accepted set
    #[error("Unexpected status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// HTTP/network error from reqwest
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport failure outside reqwest
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON deserialization error
    #[error("Deserialization error: {0}")]
    Deserialize(String),

    /// Invalid parameter provided
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Response parsed but lacked an expected field
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Operation not offered by this venue
    #[error("Unsupported by {venue}: {operation}")]
    Unsupported {
        venue: &'static str,
        operation: &'static str,
    },
}

impl ApiError {
    /// HTTP status code, if this error came from one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            #[cfg(feature = "http")]
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the error is the exhausted-retries connection error.
    pub fn is_connection(&self) -> bool {
        matches!(self, ApiError::Connection { .. })
    }

    pub(crate) fn missing(what: impl std::fmt::Display) -> Self {
        ApiError::UnexpectedResponse(format!("missing {}", what))
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
