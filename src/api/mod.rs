//! API Module
//!
//! HTTP handlers and routing for administering registered caches.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /caches` - Info of every registered cache
//! - `POST /caches/reset` - Reset every registered cache
//! - `DELETE /caches/functions/:name` - Clear caches whose name contains `name`
//! - `DELETE /caches/functions/:name/partitions/:partition` - Clear one partition
//! - `DELETE /caches/types/:name` - Clear cached methods of matching types

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
