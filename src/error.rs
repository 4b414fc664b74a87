//! Error types for the caching engine
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the caching engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Call arguments could not be canonically encoded
    #[error("Unhashable input: {0}")]
    UnhashableInput(String),

    /// Networked backend could not be reached or timed out
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Key not present in the backend
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A result could not be encoded for storage or decoded on a hit
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The wrapped function itself failed
    #[error("Wrapped call failed: {0}")]
    Call(#[source] anyhow::Error),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::UnhashableInput(_) => StatusCode::BAD_REQUEST,
            CacheError::KeyNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Serialization(_) | CacheError::Call(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the caching engine.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_unavailable_maps_to_503() {
        let response = CacheError::BackendUnavailable("redis down".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_unhashable_maps_to_400() {
        let response = CacheError::UnhashableInput("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_call_error_keeps_source() {
        let err = CacheError::Call(anyhow::anyhow!("boom"));
        assert!(err.to_string().contains("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
