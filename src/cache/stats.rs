//! Cache Statistics Module
//!
//! Hit/miss accounting for one cached function.

use serde::Serialize;

use crate::cache::PartitionSelector;

// == Wrapper Stats ==
/// Hit and miss counters of one cached function.
///
/// Interval counters can be reset on their own; lifetime counters are only
/// zeroed by a full reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WrapperStats {
    /// Hits since the last reset
    pub hits: u64,
    /// Misses since the last reset
    pub misses: u64,
    /// Hits since creation or the last full reset
    pub lifetime_hits: u64,
    /// Misses since creation or the last full reset
    pub lifetime_misses: u64,
}

impl WrapperStats {
    // == Constructor ==
    /// Creates a new WrapperStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the interval hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no calls have been made.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.misses)
    }

    /// Same as [`hit_rate`](Self::hit_rate) over the lifetime counters.
    pub fn lifetime_hit_rate(&self) -> f64 {
        ratio(self.lifetime_hits, self.lifetime_misses)
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.lifetime_hits += 1;
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.lifetime_misses += 1;
    }

    // == Resets ==
    /// Zeroes the interval counters only.
    pub fn reset_interval(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// == Cache Outcome ==
/// Whether a call was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    Hit,
    Miss,
}

// == Cache Info ==
/// Snapshot of one cached function for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    /// Qualified function name (`Type::method` for methods)
    pub name: String,
    #[serde(flatten)]
    pub stats: WrapperStats,
    /// Entries currently stored
    pub size: usize,
    /// Entries evicted by the size bound
    pub evictions: u64,
    /// Configured TTL, None when expiry is disabled
    pub ttl_seconds: Option<f64>,
    /// Configured size bound, None when unbounded
    pub max_size: Option<usize>,
    pub partition: PartitionSelector,
}
