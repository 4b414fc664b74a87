//! Cache Key Module
//!
//! Composes full cache keys from a partition value and an argument hash, and
//! selects the partition value of a call.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CallArgs, DEFAULT_PARTITION, KEY_SEPARATOR};
use crate::error::{CacheError, Result};

/// Joins a partition value and an argument hash into a full key.
pub fn compose_key(partition: &str, hash: &str) -> String {
    format!("{}{}{}", partition, KEY_SEPARATOR, hash)
}

/// Recovers the partition value of a full key.
///
/// Splits at the last separator: argument hashes are hex and never contain
/// it, so partition values that do contain it round-trip exactly.
pub fn partition_of(full_key: &str) -> Option<&str> {
    full_key
        .rsplit_once(KEY_SEPARATOR)
        .map(|(partition, _)| partition)
}

// == Partition Selector ==
/// Chooses which argument, if any, partitions a function's cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionSelector {
    /// Every call lands in the default partition
    #[default]
    None,
    /// Positional argument at this index (counting the receiver for methods)
    Positional(usize),
    /// Keyword argument with this name, default partition when absent
    Keyword(String),
}

impl PartitionSelector {
    /// Returns the partition value for a call.
    pub fn select(&self, args: &CallArgs) -> Result<String> {
        match self {
            PartitionSelector::None => Ok(DEFAULT_PARTITION.to_string()),
            PartitionSelector::Positional(index) => args
                .positional()
                .get(*index)
                .map(partition_text)
                .ok_or_else(|| {
                    CacheError::UnhashableInput(format!(
                        "partition index {} out of range for {} positional arguments",
                        index,
                        args.positional().len()
                    ))
                }),
            PartitionSelector::Keyword(name) => Ok(args
                .keyword()
                .get(name)
                .map(partition_text)
                .unwrap_or_else(|| DEFAULT_PARTITION.to_string())),
        }
    }
}

impl fmt::Display for PartitionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionSelector::None => write!(f, "none"),
            PartitionSelector::Positional(index) => write!(f, "#{}", index),
            PartitionSelector::Keyword(name) => write!(f, "{}", name),
        }
    }
}

/// Strings are used verbatim, everything else as compact JSON.
fn partition_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
