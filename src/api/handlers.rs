//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::models::{CachesResponse, ClearResponse, HealthResponse, PartitionClearResponse};
use crate::registry::Registry;

/// Application state shared across all handlers.
///
/// Holds the registry whose caches the endpoints administer.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
}

impl AppState {
    /// Creates a new AppState over the given registry.
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Creates an AppState over the process-wide registry.
    pub fn global() -> Self {
        Self::new(Registry::global())
    }
}

/// Handler for GET /caches
///
/// Returns info of every registered cache.
pub async fn list_caches_handler(State(state): State<AppState>) -> Result<Json<CachesResponse>> {
    let caches = state.registry.info().await?;
    Ok(Json(CachesResponse::new(caches)))
}

/// Handler for POST /caches/reset
///
/// Resets counters and stores of every registered cache.
pub async fn reset_all_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    let names = state.registry.reset_all().await?;
    Ok(Json(ClearResponse::new("Reset", names)))
}

/// Handler for DELETE /caches/functions/:name
pub async fn clear_function_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClearResponse>> {
    let matched = state.registry.clear_by_function_name(&name).await?;
    Ok(Json(ClearResponse::new("Cleared", matched)))
}

/// Handler for DELETE /caches/functions/:name/partitions/:partition
pub async fn clear_partition_handler(
    State(state): State<AppState>,
    Path((name, partition)): Path<(String, String)>,
) -> Result<Json<PartitionClearResponse>> {
    let removed = state
        .registry
        .clear_partition_by_function_name(&name, &partition)
        .await?;
    Ok(Json(PartitionClearResponse::new(name, partition, removed)))
}

/// Handler for DELETE /caches/types/:name
pub async fn clear_type_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ClearResponse>> {
    let matched = state.registry.clear_by_type_name(&name).await?;
    Ok(Json(ClearResponse::new("Cleared", matched)))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ArgumentHasher, CallArgs};
    use crate::interceptor::CacheBuilder;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_list_caches_handler() {
        let registry = Registry::new();
        let cached = CacheBuilder::new("handler_fn")
            .registry(registry.clone())
            .hasher(Arc::new(ArgumentHasher::default()))
            .writes_enabled(true)
            .wrap_function(|_args: CallArgs| async move { Ok(5) });
        cached.invoke(CallArgs::new()).await.unwrap();

        let response = list_caches_handler(State(AppState::new(registry)))
            .await
            .unwrap();

        assert_eq!(response.count, 1);
        assert_eq!(response.caches["handler_fn"][0].size, 1);
    }

    #[tokio::test]
    async fn test_clear_function_handler() {
        let registry = Registry::new();
        let cached = CacheBuilder::new("to_clear")
            .registry(registry.clone())
            .hasher(Arc::new(ArgumentHasher::default()))
            .writes_enabled(true)
            .wrap_function(|_args: CallArgs| async move { Ok(5) });
        cached.invoke(CallArgs::new()).await.unwrap();

        let response = clear_function_handler(
            State(AppState::new(registry)),
            Path("to_".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(response.matched, vec!["to_clear"]);
        assert_eq!(cached.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_partition_handler_no_match() {
        let state = AppState::new(Registry::new());

        let response = clear_partition_handler(
            State(state),
            Path(("nothing".to_string(), "1".to_string())),
        )
        .await
        .unwrap();

        assert_eq!(response.removed, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
