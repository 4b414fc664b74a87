//! Cache Entry Module
//!
//! Defines stored entries and the clock used to timestamp them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A stored call result and the time it was inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored result
    pub value: Value,
    /// Insertion timestamp (Unix milliseconds)
    pub inserted_at_ms: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with `now_ms`.
    pub fn new(value: Value, now_ms: u64) -> Self {
        Self {
            value,
            inserted_at_ms: now_ms,
        }
    }

    // == Age ==
    /// Milliseconds since insertion, zero if the clock went backwards.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.inserted_at_ms)
    }

    // == Is Expired ==
    /// Checks whether the entry is older than `ttl`.
    ///
    /// An entry exactly `ttl` old is still valid; it expires once its age
    /// is strictly greater.
    pub fn is_expired(&self, ttl: Duration, now_ms: u64) -> bool {
        u128::from(self.age_ms(now_ms)) > ttl.as_millis()
    }
}

// == Clock ==
/// Time source for entry timestamps.
pub trait Clock: Send + Sync {
    /// Current time as Unix milliseconds.
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        current_timestamp_ms()
    }
}

/// Manually advanced clock for deterministic expiry.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jumps the clock to `now_ms`.
    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
