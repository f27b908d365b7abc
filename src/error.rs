//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend could not be constructed or failed its liveness probe
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Precondition ticket is malformed
    #[error("Invalid precondition: {0}")]
    InvalidPrecondition(String),

    /// Precondition ticket validity window has elapsed
    #[error("Precondition expired")]
    PreconditionExpired,

    /// Value could not be encoded, or a stored payload could not be decoded
    #[error("Serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Caller-supplied producer failed
    #[error("Producer failed: {0}")]
    Producer(anyhow::Error),

    /// Backend rejected a write or delete
    #[error("Backend write failed: {0}")]
    BackendWrite(String),

    /// Backend read or driver failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Remote call exceeded its operation timeout
    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    /// Unknown backend type or out-of-range setting
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Key not found (admin surface only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data (admin surface only)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::InvalidPrecondition(_) | CacheError::PreconditionExpired => {
                StatusCode::FORBIDDEN
            }
            CacheError::BackendUnavailable(_) | CacheError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Producer(_)
            | CacheError::BackendWrite(_)
            | CacheError::Backend(_)
            | CacheError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
