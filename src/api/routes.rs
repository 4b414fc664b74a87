//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_function_handler, clear_partition_handler, clear_type_handler, health_handler,
    list_caches_handler, reset_all_handler, AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /caches` - Info of every registered cache
/// - `POST /caches/reset` - Reset every registered cache
/// - `DELETE /caches/functions/:name` - Clear caches by function name
/// - `DELETE /caches/functions/:name/partitions/:partition` - Clear one partition
/// - `DELETE /caches/types/:name` - Clear cached methods by owning type
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/caches", get(list_caches_handler))
        .route("/caches/reset", post(reset_all_handler))
        .route("/caches/functions/:name", delete(clear_function_handler))
        .route(
            "/caches/functions/:name/partitions/:partition",
            delete(clear_partition_handler),
        )
        .route("/caches/types/:name", delete(clear_type_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
