//! Shared test doubles for the integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use callcache::cache::CacheEntry;
use callcache::{CacheError, InMemoryBackend, Result, StorageBackend};

/// In-memory backend that can be switched off to simulate a lost connection.
pub struct FlakyBackend {
    inner: InMemoryBackend,
    online: Arc<AtomicBool>,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self {
            inner: InMemoryBackend::new(),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared on/off switch; storing `false` takes the backend offline.
    pub fn switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.online)
    }

    fn check(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::BackendUnavailable("connection refused".to_string()))
        }
    }
}

#[async_trait]
impl StorageBackend for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&mut self, key: &str, entry: CacheEntry) -> Result<()> {
        self.check()?;
        self.inner.set(key, entry).await
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        self.check()?;
        self.inner.contains(key).await
    }

    async fn len(&self) -> Result<usize> {
        self.check()?;
        self.inner.len().await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.check()?;
        self.inner.keys().await
    }

    async fn clear(&mut self) -> Result<()> {
        self.check()?;
        self.inner.clear().await
    }
}
