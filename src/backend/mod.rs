//! Storage Backends
//!
//! The keyed store a [`CacheEngine`](crate::cache::CacheEngine) writes into.
//!
//! # Backends
//! - [`InMemoryBackend`]: insertion ordered map in this process
//! - `RedisBackend`: one Redis hash per namespace (requires the `redis` feature)

use async_trait::async_trait;

use crate::cache::CacheEntry;
use crate::error::Result;

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::InMemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::{RedisBackend, RedisConfig};

// == Storage Backend ==
/// Keyed map of cache entries.
///
/// Implementations report connectivity problems as
/// [`CacheError::BackendUnavailable`](crate::error::CacheError::BackendUnavailable),
/// never as a missing key.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Reads an entry, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Writes an entry, replacing any previous one under `key`.
    async fn set(&mut self, key: &str, entry: CacheEntry) -> Result<()>;

    /// Removes an entry; `KeyNotFound` when absent.
    async fn delete(&mut self, key: &str) -> Result<()>;

    async fn contains(&self, key: &str) -> Result<bool>;

    async fn len(&self) -> Result<usize>;

    /// All keys. Order is backend specific.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Removes every entry.
    async fn clear(&mut self) -> Result<()>;
}
