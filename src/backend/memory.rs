//! In-Memory Backend
//!
//! HashMap storage with insertion order tracking.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::backend::StorageBackend;
use crate::cache::{CacheEntry, InsertionOrder};
use crate::error::{CacheError, Result};

// == In-Memory Backend ==
/// Local map of cache entries; `keys()` returns insertion order.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Insertion order of `entries`
    order: InsertionOrder,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, entry: CacheEntry) -> Result<()> {
        self.entries.insert(key.to_string(), entry);
        self.order.push(key);
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            Ok(())
        } else {
            Err(CacheError::KeyNotFound(key.to_string()))
        }
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.order.iter().cloned().collect())
    }

    async fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.order.clear();
        Ok(())
    }
}
