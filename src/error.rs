//! Error types for the cache library and its HTTP surface
//!
//! Provides unified error handling using thiserror. Runtime cache operations
//! use these internally and convert them to sentinel values at the public
//! boundary; only configuration errors escape constructors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the crate.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache (or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid construction-time configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Value could not be (de)serialized across the storage boundary
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Prewarm loader failure for a single key
    #[error("Loader error: {0}")]
    Loader(String),

    /// Device connect/query failure
    #[error("Device error: {0}")]
    Device(String),

    /// Caller exceeded its fixed-window request budget
    #[error("Rate limit exceeded, window resets at {reset_time}")]
    RateLimited { reset_time: u64 },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            CacheError::Device(_) => StatusCode::BAD_GATEWAY,
            CacheError::InvalidConfig(_) | CacheError::Loader(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
