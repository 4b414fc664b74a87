//! Callcache - call-result caching for async Rust
//!
//! Wraps functions and methods with a cache keyed on their arguments, with
//! TTL expiry, FIFO eviction and partitioned invalidation over pluggable
//! storage.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod interceptor;
pub mod models;
pub mod registry;

pub use api::AppState;
pub use backend::{InMemoryBackend, StorageBackend};
pub use cache::{
    ArgumentHasher, CacheEngine, CacheInfo, CacheOutcome, CallArgs, EngineConfig,
    PartitionSelector, WrapperStats,
};
pub use config::Config;
pub use error::{CacheError, Result};
pub use interceptor::{
    wrap_function, wrap_method, CacheBuilder, CachedFunction, CachedMethod, CallInterceptor,
};
pub use registry::{CacheHandle, Registry};
