//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::CacheInfo;

/// Response body for the cache listing (GET /caches)
#[derive(Debug, Clone, Serialize)]
pub struct CachesResponse {
    /// Number of registered caches
    pub count: usize,
    /// Cache info grouped by qualified function name
    pub caches: BTreeMap<String, Vec<CacheInfo>>,
    /// Time the snapshot was taken, ISO 8601
    pub generated_at: String,
}

impl CachesResponse {
    /// Creates a new CachesResponse stamped with the current time
    pub fn new(caches: BTreeMap<String, Vec<CacheInfo>>) -> Self {
        Self {
            count: caches.values().map(Vec::len).sum(),
            caches,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for bulk clears and resets
/// (POST /caches/reset, DELETE /caches/functions/:name, DELETE /caches/types/:name)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Qualified names of the affected caches
    pub matched: Vec<String>,
}

impl ClearResponse {
    /// Creates a new ClearResponse
    pub fn new(action: &str, matched: Vec<String>) -> Self {
        Self {
            message: format!("{} {} cache(s)", action, matched.len()),
            matched,
        }
    }
}

/// Response body for partition clears
/// (DELETE /caches/functions/:name/partitions/:partition)
#[derive(Debug, Clone, Serialize)]
pub struct PartitionClearResponse {
    /// Success message
    pub message: String,
    /// Function name pattern that was matched
    pub function: String,
    /// Cleared partition value
    pub partition: String,
    /// Entries removed across all matching caches
    pub removed: usize,
}

impl PartitionClearResponse {
    pub fn new(function: impl Into<String>, partition: impl Into<String>, removed: usize) -> Self {
        let function = function.into();
        let partition = partition.into();
        Self {
            message: format!(
                "Partition '{}' of '{}' cleared: {} entries removed",
                partition, function, removed
            ),
            function,
            partition,
            removed,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
