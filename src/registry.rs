//! Registry Module
//!
//! Explicit registry of live cached functions for bulk administration.
//! Cached functions register themselves when built; the registry only keeps
//! weak references, so dropping a cached function unregisters it.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::info;

use crate::cache::{CacheInfo, WrapperStats};
use crate::error::Result;

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

// == Cache Handle ==
/// Administrative surface of one cached function.
#[async_trait]
pub trait CacheHandle: Send + Sync {
    /// Function name as given when wrapping
    fn name(&self) -> &str;

    /// Owning type name for method wrappers
    fn owner(&self) -> Option<&str>;

    /// `Type::name` for methods, `name` for free functions
    fn qualified_name(&self) -> String {
        match self.owner() {
            Some(owner) => format!("{}::{}", owner, self.name()),
            None => self.name().to_string(),
        }
    }

    fn stats(&self) -> WrapperStats;

    async fn info(&self) -> Result<CacheInfo>;

    async fn reset(&self) -> Result<()>;

    async fn clear_all(&self) -> Result<()>;

    async fn clear_partition(&self, partition: &str) -> Result<usize>;

    async fn size(&self) -> Result<usize>;
}

// == Registry ==
/// Set of live cached functions.
///
/// Cloning shares the same underlying set.
#[derive(Clone, Default)]
pub struct Registry {
    handles: Arc<RwLock<Vec<Weak<dyn CacheHandle>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry cached functions join by default.
    pub fn global() -> Registry {
        GLOBAL.clone()
    }

    /// Adds a handle; dead entries are pruned on the way.
    pub fn register(&self, handle: &Arc<dyn CacheHandle>) {
        let mut handles = self.handles.write();
        handles.retain(|weak| weak.strong_count() > 0);
        handles.push(Arc::downgrade(handle));
    }

    /// Live handles in registration order.
    pub fn list(&self) -> Vec<Arc<dyn CacheHandle>> {
        self.handles.read().iter().filter_map(Weak::upgrade).collect()
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Bulk Operations ==
    /// Resets every cached function; returns their qualified names.
    pub async fn reset_all(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for handle in self.list() {
            handle.reset().await?;
            names.push(handle.qualified_name());
        }
        info!("Reset {} cached functions", names.len());
        Ok(names)
    }

    /// Clears every cached function whose qualified name contains `pattern`.
    pub async fn clear_by_function_name(&self, pattern: &str) -> Result<Vec<String>> {
        let mut matched = Vec::new();
        for handle in self.list() {
            let name = handle.qualified_name();
            if name.contains(pattern) {
                handle.clear_all().await?;
                matched.push(name);
            }
        }
        info!("Cleared {} cached functions matching '{}'", matched.len(), pattern);
        Ok(matched)
    }

    /// Clears every cached method whose owning type name contains `pattern`.
    pub async fn clear_by_type_name(&self, pattern: &str) -> Result<Vec<String>> {
        let mut matched = Vec::new();
        for handle in self.list() {
            if handle.owner().is_some_and(|owner| owner.contains(pattern)) {
                handle.clear_all().await?;
                matched.push(handle.qualified_name());
            }
        }
        info!("Cleared {} cached methods of types matching '{}'", matched.len(), pattern);
        Ok(matched)
    }

    /// Clears `partition` in every cached function whose qualified name
    /// contains `pattern`; returns the total number of removed entries.
    pub async fn clear_partition_by_function_name(
        &self,
        pattern: &str,
        partition: &str,
    ) -> Result<usize> {
        let mut removed = 0;
        for handle in self.list() {
            if handle.qualified_name().contains(pattern) {
                removed += handle.clear_partition(partition).await?;
            }
        }
        Ok(removed)
    }

    /// Info of every cached function, grouped by qualified name.
    pub async fn info(&self) -> Result<BTreeMap<String, Vec<CacheInfo>>> {
        let mut infos: BTreeMap<String, Vec<CacheInfo>> = BTreeMap::new();
        for handle in self.list() {
            let info = handle.info().await?;
            infos.entry(info.name.clone()).or_default().push(info);
        }
        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ArgumentHasher, CallArgs};
    use crate::interceptor::CacheBuilder;
    use serde::Serialize;

    #[derive(Serialize)]
    struct PatientDb {
        region: String,
    }

    fn builder(name: &str, registry: &Registry) -> CacheBuilder {
        CacheBuilder::new(name)
            .registry(registry.clone())
            .hasher(Arc::new(ArgumentHasher::default()))
            .writes_enabled(true)
    }

    #[tokio::test]
    async fn test_clear_by_function_name() {
        let registry = Registry::new();
        let count = builder("count_patients", &registry)
            .wrap_function(|_args: CallArgs| async move { Ok(1) });
        let other = builder("list_doctors", &registry)
            .wrap_function(|_args: CallArgs| async move { Ok(2) });

        count.invoke(CallArgs::new()).await.unwrap();
        other.invoke(CallArgs::new()).await.unwrap();

        let matched = registry.clear_by_function_name("patient").await.unwrap();

        assert_eq!(matched, vec!["count_patients"]);
        assert_eq!(count.size().await.unwrap(), 0);
        assert_eq!(other.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_clear_by_type_name() {
        let registry = Registry::new();
        let get_by_id = builder("get_by_id", &registry).wrap_method(
            "PatientDb",
            |db: Arc<PatientDb>, args: CallArgs| async move {
                Ok(format!("{}:{}", db.region, args.arg_as::<u32>(0)?))
            },
        );
        let free = builder("PatientDb_helper", &registry)
            .wrap_function(|_args: CallArgs| async move { Ok(0) });

        let db = Arc::new(PatientDb { region: "eu".to_string() });
        get_by_id.invoke(&db, CallArgs::new().arg(7)).await.unwrap();
        free.invoke(CallArgs::new()).await.unwrap();

        let matched = registry.clear_by_type_name("Patient").await.unwrap();

        assert_eq!(matched, vec!["PatientDb::get_by_id"]);
        assert_eq!(get_by_id.size().await.unwrap(), 0);
        assert_eq!(free.size().await.unwrap(), 1, "free functions have no owning type");
    }

    #[tokio::test]
    async fn test_clear_partition_by_function_name() {
        let registry = Registry::new();
        let lookup = builder("lookup", &registry)
            .partition_by_keyword("user_id")
            .wrap_function(|_args: CallArgs| async move { Ok(0) });

        for user in [1, 10, 11] {
            lookup.invoke(CallArgs::new().kwarg("user_id", user)).await.unwrap();
        }

        let removed = registry
            .clear_partition_by_function_name("look", "1")
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(lookup.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reset_all_and_info() {
        let registry = Registry::new();
        let first = builder("first", &registry)
            .wrap_function(|_args: CallArgs| async move { Ok(1) });
        let second = builder("second", &registry)
            .wrap_function(|_args: CallArgs| async move { Ok(2) });

        first.invoke(CallArgs::new()).await.unwrap();
        first.invoke(CallArgs::new()).await.unwrap();
        second.invoke(CallArgs::new()).await.unwrap();

        let info = registry.info().await.unwrap();
        assert_eq!(info.len(), 2);
        assert_eq!(info["first"][0].stats.hits, 1);
        assert_eq!(info["second"][0].size, 1);

        let names = registry.reset_all().await.unwrap();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(first.stats(), WrapperStats::default());
        assert_eq!(second.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_functions_are_skipped() {
        let registry = Registry::new();
        let kept = builder("kept", &registry)
            .wrap_function(|_args: CallArgs| async move { Ok(1) });
        {
            let _dropped = builder("dropped", &registry)
                .wrap_function(|_args: CallArgs| async move { Ok(1) });
        }

        let names: Vec<String> = registry.list().iter().map(|h| h.qualified_name()).collect();
        assert_eq!(names, vec!["kept"]);
        assert_eq!(kept.name(), "kept");
    }
}
