//! Call Arguments Module
//!
//! Positional and keyword arguments of an intercepted call, held as
//! canonical JSON values so they can be hashed deterministically.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::cache::ensure_finite;
use crate::error::{CacheError, Result};

// == Call Args ==
/// Arguments of a single call.
///
/// Built with [`CallArgs::arg`] and [`CallArgs::kwarg`]. A value that cannot be
/// encoded is remembered and reported as [`CacheError::UnhashableInput`] when
/// the arguments are hashed, so the builder itself never fails.
///
/// ```
/// use callcache::CallArgs;
///
/// let args = CallArgs::new().arg(1).arg("abc").kwarg("user_id", 42);
/// assert_eq!(args.positional().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
    invalid: Option<String>,
}

impl CallArgs {
    // == Constructor ==
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Builders ==
    /// Appends a positional argument.
    pub fn arg<T: Serialize>(mut self, value: T) -> Self {
        match encode(&value) {
            Ok(value) => self.positional.push(value),
            Err(reason) => self.mark_invalid(format!("positional #{}: {}", self.positional.len(), reason)),
        }
        self
    }

    /// Sets a keyword argument. Setting the same name twice keeps the last value.
    pub fn kwarg<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Self {
        let name = name.into();
        match encode(&value) {
            Ok(value) => {
                self.keyword.insert(name, value);
            }
            Err(reason) => self.mark_invalid(format!("keyword '{}': {}", name, reason)),
        }
        self
    }

    /// Returns a copy with `receiver` inserted as positional argument 0.
    ///
    /// Method wrappers hash the owning instance this way, which is why a
    /// positional partition index on a method counts the receiver.
    pub fn with_receiver<S: Serialize + ?Sized>(&self, receiver: &S) -> Self {
        let mut args = self.clone();
        match encode(receiver) {
            Ok(value) => args.positional.insert(0, value),
            Err(reason) => args.mark_invalid(format!("receiver: {}", reason)),
        }
        args
    }

    fn mark_invalid(&mut self, reason: String) {
        if self.invalid.is_none() {
            self.invalid = Some(reason);
        }
    }

    // == Accessors ==
    /// Positional arguments in call order.
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword arguments, sorted by name.
    pub fn keyword(&self) -> &BTreeMap<String, Value> {
        &self.keyword
    }

    /// Decodes positional argument `index` into `T`.
    pub fn arg_as<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self.positional.get(index).ok_or_else(|| {
            CacheError::Serialization(format!("no positional argument at index {}", index))
        })?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Decodes keyword argument `name` into `T`, or `None` when absent.
    pub fn kwarg_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.keyword
            .get(name)
            .map(|value| serde_json::from_value(value.clone()).map_err(CacheError::from))
            .transpose()
    }

    // == Canonical Encoding ==
    /// Encodes the arguments as `[positional, keyword]` JSON text.
    ///
    /// Object keys are sorted at every depth, so the encoding does not depend
    /// on keyword insertion order or on the iteration order of map arguments.
    pub fn canonical_encoding(&self) -> Result<String> {
        if let Some(reason) = &self.invalid {
            return Err(CacheError::UnhashableInput(reason.clone()));
        }
        serde_json::to_string(&(&self.positional, &self.keyword))
            .map_err(|e| CacheError::UnhashableInput(e.to_string()))
    }
}

// == Utility Functions ==
/// Converts a value to JSON with object keys sorted recursively.
/// Non-finite floats are rejected rather than collapsed into `null`.
fn encode<T: Serialize + ?Sized>(value: &T) -> std::result::Result<Value, String> {
    ensure_finite(value).map_err(|e| e.to_string())?;
    serde_json::to_value(value)
        .map(canonicalize)
        .map_err(|e| e.to_string())
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        other => other,
    }
}
