//! Cache Engine Module
//!
//! Combines a storage backend with TTL expiry, FIFO eviction and partitioned
//! clearing. Every backend access goes through one async mutex.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::backend::{InMemoryBackend, StorageBackend};
use crate::cache::{
    compose_key, partition_of, CacheEntry, Clock, InsertionOrder, PartitionSelector, SystemClock,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Engine Config ==
/// Expiry, size bound and partitioning of one engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum entry age, None disables expiry
    pub ttl: Option<Duration>,
    /// Maximum entry count, None disables eviction
    pub max_size: Option<usize>,
    /// Argument partitioning the key space
    pub partition: PartitionSelector,
    /// When false, `insert` is a no-op
    pub writes_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            max_size: None,
            partition: PartitionSelector::None,
            writes_enabled: Config::global().enabled,
        }
    }
}

impl EngineConfig {
    /// Builds a config from raw settings where `<= 0` disables the feature.
    pub fn from_raw(ttl_seconds: i64, max_size: i64) -> Self {
        Self {
            ttl: (ttl_seconds > 0).then(|| Duration::from_secs(ttl_seconds as u64)),
            max_size: (max_size > 0).then_some(max_size as usize),
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = (!ttl.is_zero()).then_some(ttl);
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = (max_size > 0).then_some(max_size);
        self
    }

    pub fn with_partition(mut self, partition: PartitionSelector) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_writes_enabled(mut self, enabled: bool) -> Self {
        self.writes_enabled = enabled;
        self
    }
}

/// Backend plus the bookkeeping guarded by the engine lock.
struct EngineState {
    backend: Box<dyn StorageBackend>,
    /// Insertion order of full keys, the FIFO eviction queue
    order: InsertionOrder,
    evictions: u64,
}

impl EngineState {
    /// Deletes a key, tolerating its absence.
    async fn remove(&mut self, full_key: &str) -> Result<bool> {
        self.order.remove(full_key);
        match self.backend.delete(full_key).await {
            Ok(()) => Ok(true),
            Err(CacheError::KeyNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Evicts the earliest inserted entry.
    async fn evict_oldest(&mut self) -> Result<Option<String>> {
        while let Some(victim) = self.order.pop_oldest() {
            match self.backend.delete(&victim).await {
                Ok(()) => return Ok(Some(victim)),
                // Already gone from the backend, try the next one
                Err(CacheError::KeyNotFound(_)) => continue,
                Err(err) => {
                    self.order.push_front(victim);
                    return Err(err);
                }
            }
        }

        // Entries the engine never saw inserted: fall back to backend order
        let Some(victim) = self.backend.keys().await?.into_iter().next() else {
            return Ok(None);
        };
        match self.backend.delete(&victim).await {
            Ok(()) => Ok(Some(victim)),
            Err(CacheError::KeyNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

// == Cache Engine ==
/// Keyed store of call results for one cached function.
///
/// Full keys are `partition + "_" + argument hash`. Expired entries are purged
/// lazily on lookup; there is no background sweep.
pub struct CacheEngine {
    state: Mutex<EngineState>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl CacheEngine {
    // == Constructors ==
    /// Creates an engine over `backend`, timestamping with the wall clock.
    pub fn new(backend: Box<dyn StorageBackend>, config: EngineConfig) -> Self {
        Self::with_clock(backend, config, Arc::new(SystemClock))
    }

    /// Creates an engine over a fresh in-memory backend.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(Box::new(InMemoryBackend::new()), config)
    }

    pub fn with_clock(
        backend: Box<dyn StorageBackend>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Mutex::new(EngineState {
                backend,
                order: InsertionOrder::new(),
                evictions: 0,
            }),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // == Lookup ==
    /// Returns the entry stored for `key` in `partition`.
    ///
    /// With a TTL configured, an entry older than the TTL is deleted and
    /// reported as a miss. Never evicts or inserts.
    pub async fn lookup(&self, key: &str, partition: &str) -> Result<Option<CacheEntry>> {
        let full_key = compose_key(partition, key);
        let mut state = self.state.lock().await;

        let Some(entry) = state.backend.get(&full_key).await? else {
            return Ok(None);
        };

        if let Some(ttl) = self.config.ttl {
            let now = self.clock.now_ms();
            if entry.is_expired(ttl, now) {
                state.remove(&full_key).await?;
                debug!(
                    "Expired entry purged: {} (age {}ms)",
                    full_key,
                    entry.age_ms(now)
                );
                return Ok(None);
            }
        }

        Ok(Some(entry))
    }

    // == Insert ==
    /// Stores `value` for `key` in `partition`.
    ///
    /// At capacity, the earliest inserted entry is evicted first. Replacing an
    /// existing key does not grow the store and evicts nothing. Does nothing
    /// when writes are disabled.
    pub async fn insert(&self, key: &str, value: Value, partition: &str) -> Result<()> {
        if !self.config.writes_enabled {
            return Ok(());
        }

        let full_key = compose_key(partition, key);
        let mut state = self.state.lock().await;

        if let Some(max_size) = self.config.max_size {
            let is_overwrite = state.backend.contains(&full_key).await?;
            if !is_overwrite && state.backend.len().await? >= max_size {
                if let Some(evicted) = state.evict_oldest().await? {
                    state.evictions += 1;
                    debug!("Evicted oldest entry: {}", evicted);
                }
            }
        }

        let entry = CacheEntry::new(value, self.clock.now_ms());
        state.backend.set(&full_key, entry).await?;
        state.order.push(&full_key);

        Ok(())
    }

    // == Clear All ==
    /// Removes every entry.
    pub async fn clear_all(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.backend.clear().await?;
        state.order.clear();
        Ok(())
    }

    // == Clear Partition ==
    /// Removes every entry of exactly `partition`; returns how many.
    ///
    /// Entries of partitions that merely contain `partition` as a substring
    /// (e.g. `10` for `1`) are kept.
    pub async fn clear_partition(&self, partition: &str) -> Result<usize> {
        let mut state = self.state.lock().await;

        let keys = state.backend.keys().await?;
        let mut removed = 0;
        for key in keys
            .iter()
            .filter(|key| partition_of(key) == Some(partition))
        {
            if state.remove(key).await? {
                removed += 1;
            }
        }

        info!("Cleared partition '{}': {} entries removed", partition, removed);
        Ok(removed)
    }

    // == Length ==
    /// Returns the current number of entries.
    pub async fn len(&self) -> Result<usize> {
        self.state.lock().await.backend.len().await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Number of entries evicted by the size bound so far.
    pub async fn evictions(&self) -> u64 {
        self.state.lock().await.evictions
    }
}
