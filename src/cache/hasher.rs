//! Argument Hasher Module
//!
//! Turns call arguments into a fixed-length hex digest, memoizing recent
//! results in a bounded LRU map.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::cache::CallArgs;
use crate::config::Config;
use crate::error::Result;

static SHARED: Lazy<Arc<ArgumentHasher>> =
    Lazy::new(|| Arc::new(ArgumentHasher::new(Config::global().hash_memo_capacity)));

// == Argument Hasher ==
/// SHA-256 hasher over the canonical encoding of [`CallArgs`].
pub struct ArgumentHasher {
    /// Canonical encoding -> hex digest
    memo: Mutex<LruCache<String, String>>,
}

impl ArgumentHasher {
    // == Constructor ==
    /// Creates a hasher memoizing up to `capacity` digests (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            memo: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The process-wide hasher shared by interceptors that are not given
    /// their own.
    pub fn shared() -> Arc<ArgumentHasher> {
        Arc::clone(&SHARED)
    }

    // == Hash ==
    /// Returns the 64 character hex digest of `args`.
    ///
    /// Fails with `UnhashableInput` when the arguments have no canonical
    /// encoding. The memo never changes the returned digest.
    pub fn hash(&self, args: &CallArgs) -> Result<String> {
        let encoded = args.canonical_encoding()?;

        if let Some(digest) = self.memo.lock().get(&encoded) {
            return Ok(digest.clone());
        }

        let digest = hex::encode(Sha256::digest(encoded.as_bytes()));
        self.memo.lock().put(encoded, digest.clone());
        Ok(digest)
    }

    // == Clear ==
    /// Empties the memo.
    pub fn clear(&self) {
        self.memo.lock().clear();
    }

    /// Number of memoized digests.
    pub fn len(&self) -> usize {
        self.memo.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.memo.lock().cap().get()
    }
}

impl Default for ArgumentHasher {
    fn default() -> Self {
        Self::new(crate::cache::HASH_MEMO_CAPACITY)
    }
}
