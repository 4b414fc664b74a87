//! Cache Module
//!
//! Argument hashing, cache entries and the engine implementing TTL expiry,
//! FIFO eviction and partitioned clearing.

mod args;
mod engine;
mod entry;
mod fifo;
mod finite;
mod hasher;
mod key;
mod stats;


// Re-export public types
pub use args::CallArgs;
pub use engine::{CacheEngine, EngineConfig};
pub(crate) use finite::ensure_finite;
pub use entry::{current_timestamp_ms, CacheEntry, Clock, ManualClock, SystemClock};
pub use fifo::InsertionOrder;
pub use hasher::ArgumentHasher;
pub use key::{compose_key, partition_of, PartitionSelector};
pub use stats::{CacheInfo, CacheOutcome, WrapperStats};

// == Public Constants ==
/// Default number of memoized argument hashes
pub const HASH_MEMO_CAPACITY: usize = 10_000;

/// Partition used when no selector is configured or the keyword is absent
pub const DEFAULT_PARTITION: &str = "default";

/// Separator between the partition value and the argument hash
pub const KEY_SEPARATOR: char = '_';
