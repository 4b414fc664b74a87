//! Call Interceptor Module
//!
//! Binds a target function to a [`CacheEngine`]: hashes the arguments, picks
//! the partition, serves hits from the engine and runs the target on misses.
//!
//! # Example
//! ```
//! use callcache::{CacheBuilder, CallArgs, Registry};
//!
//! # tokio_test::block_on(async {
//! let add = CacheBuilder::new("add")
//!     .registry(Registry::new())
//!     .wrap_function(|args: CallArgs| async move {
//!         let a: i64 = args.arg_as(0)?;
//!         let b: i64 = args.arg_as(1)?;
//!         Ok(a + b)
//!     });
//!
//! assert_eq!(add.invoke(CallArgs::new().arg(1).arg(2)).await.unwrap(), 3);
//! assert_eq!(add.stats().lifetime_misses, 1);
//! # });
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::StorageBackend;
use crate::cache::{
    ensure_finite, ArgumentHasher, CacheEngine, CacheInfo, CacheOutcome, CallArgs, Clock,
    EngineConfig, PartitionSelector, SystemClock, WrapperStats,
};
use crate::error::{CacheError, Result};
use crate::registry::{CacheHandle, Registry};

// == Call Interceptor ==
/// Shared state of one cached function: its engine, hasher and counters.
///
/// Reached through [`CachedFunction`] / [`CachedMethod`] (which deref to it)
/// or through the [`Registry`] as a [`CacheHandle`].
pub struct CallInterceptor {
    name: String,
    owner: Option<String>,
    engine: Arc<CacheEngine>,
    hasher: Arc<ArgumentHasher>,
    stats: Mutex<WrapperStats>,
}

impl CallInterceptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn engine(&self) -> &Arc<CacheEngine> {
        &self.engine
    }

    pub fn hasher(&self) -> &Arc<ArgumentHasher> {
        &self.hasher
    }

    /// Serves `args` from the cache, or runs `target` and stores its result.
    ///
    /// A failing target stores nothing and moves no counter. A result that
    /// would not decode back unchanged is returned but not stored. Concurrent misses
    /// on the same key may each run the target; the last insert wins.
    async fn resolve<R, Fut>(
        &self,
        args: &CallArgs,
        target: impl FnOnce() -> Fut,
    ) -> Result<(R, CacheOutcome)>
    where
        Fut: Future<Output = anyhow::Result<R>>,
        R: Serialize + DeserializeOwned,
    {
        let key = self.hasher.hash(args)?;
        let partition = self.engine.config().partition.select(args)?;

        if let Some(entry) = self.engine.lookup(&key, &partition).await? {
            let value = serde_json::from_value(entry.value)?;
            self.stats.lock().record_hit();
            debug!("Cache hit: {} [{}]", self.qualified_name(), partition);
            return Ok((value, CacheOutcome::Hit));
        }

        let result = target().await.map_err(CacheError::Call)?;
        match storable(&result) {
            Ok(encoded) => self.engine.insert(&key, encoded, &partition).await?,
            Err(reason) => warn!(
                "Result of {} not cached, it does not survive storage: {}",
                self.qualified_name(),
                reason
            ),
        }
        self.stats.lock().record_miss();
        debug!("Cache miss: {} [{}]", self.qualified_name(), partition);

        Ok((result, CacheOutcome::Miss))
    }

    // == Stats ==
    /// Snapshot of the hit/miss counters.
    pub fn stats(&self) -> WrapperStats {
        *self.stats.lock()
    }

    /// Counters plus size and configuration.
    pub async fn info(&self) -> Result<CacheInfo> {
        let config = self.engine.config();
        Ok(CacheInfo {
            name: self.qualified_name(),
            stats: self.stats(),
            size: self.engine.len().await?,
            evictions: self.engine.evictions().await,
            ttl_seconds: config.ttl.map(|ttl| ttl.as_secs_f64()),
            max_size: config.max_size,
            partition: config.partition.clone(),
        })
    }

    // == Resets ==
    /// Zeroes all counters, empties the store and the shared hash memo.
    pub async fn reset(&self) -> Result<()> {
        self.engine.clear_all().await?;
        self.hasher.clear();
        self.stats.lock().reset();
        Ok(())
    }

    /// Zeroes the interval counters only.
    pub fn reset_interval(&self) {
        self.stats.lock().reset_interval();
    }

    /// Empties the store; counters are untouched.
    pub async fn clear_all(&self) -> Result<()> {
        self.engine.clear_all().await
    }

    pub async fn clear_partition(&self, partition: &str) -> Result<usize> {
        self.engine.clear_partition(partition).await
    }

    /// Number of stored entries.
    pub async fn size(&self) -> Result<usize> {
        self.engine.len().await
    }

    pub fn qualified_name(&self) -> String {
        CacheHandle::qualified_name(self)
    }
}

#[async_trait]
impl CacheHandle for CallInterceptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn stats(&self) -> WrapperStats {
        CallInterceptor::stats(self)
    }

    async fn info(&self) -> Result<CacheInfo> {
        CallInterceptor::info(self).await
    }

    async fn reset(&self) -> Result<()> {
        CallInterceptor::reset(self).await
    }

    async fn clear_all(&self) -> Result<()> {
        CallInterceptor::clear_all(self).await
    }

    async fn clear_partition(&self, partition: &str) -> Result<usize> {
        CallInterceptor::clear_partition(self, partition).await
    }

    async fn size(&self) -> Result<usize> {
        CallInterceptor::size(self).await
    }
}

/// Encodes a result for storage, provided a later hit can decode it again.
fn storable<R: Serialize + DeserializeOwned>(result: &R) -> Result<Value> {
    ensure_finite(result)?;
    let encoded = serde_json::to_value(result)?;
    let _: R = serde_json::from_value(encoded.clone())?;
    Ok(encoded)
}

// == Cached Function ==
/// A free function wrapped with a cache.
pub struct CachedFunction<F, R> {
    interceptor: Arc<CallInterceptor>,
    target: F,
    _result: PhantomData<fn() -> R>,
}

impl<F, Fut, R> CachedFunction<F, R>
where
    F: Fn(CallArgs) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
    R: Serialize + DeserializeOwned,
{
    /// Calls the function through the cache.
    pub async fn invoke(&self, args: CallArgs) -> Result<R> {
        self.invoke_traced(args).await.map(|(result, _)| result)
    }

    /// Like [`invoke`](Self::invoke), also reporting hit or miss.
    pub async fn invoke_traced(&self, args: CallArgs) -> Result<(R, CacheOutcome)> {
        self.interceptor
            .resolve(&args, || (self.target)(args.clone()))
            .await
    }
}

impl<F, R> CachedFunction<F, R> {
    /// Shared handle to the interceptor, e.g. for registering elsewhere.
    pub fn handle(&self) -> Arc<CallInterceptor> {
        Arc::clone(&self.interceptor)
    }
}

impl<F, R> Deref for CachedFunction<F, R> {
    type Target = CallInterceptor;

    fn deref(&self) -> &CallInterceptor {
        &self.interceptor
    }
}

// == Cached Method ==
/// A method of `S` wrapped with a cache.
///
/// The receiver is hashed as positional argument 0, so
/// [`PartitionSelector::Positional`] indexes count it: index 1 is the first
/// explicit argument.
pub struct CachedMethod<S, F, R> {
    interceptor: Arc<CallInterceptor>,
    target: F,
    _marker: PhantomData<fn(Arc<S>) -> R>,
}

impl<S, F, Fut, R> CachedMethod<S, F, R>
where
    S: Serialize,
    F: Fn(Arc<S>, CallArgs) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
    R: Serialize + DeserializeOwned,
{
    /// Calls the method on `receiver` through the cache.
    pub async fn invoke(&self, receiver: &Arc<S>, args: CallArgs) -> Result<R> {
        self.invoke_traced(receiver, args)
            .await
            .map(|(result, _)| result)
    }

    pub async fn invoke_traced(
        &self,
        receiver: &Arc<S>,
        args: CallArgs,
    ) -> Result<(R, CacheOutcome)> {
        let hashed = args.with_receiver(&**receiver);
        self.interceptor
            .resolve(&hashed, || (self.target)(Arc::clone(receiver), args))
            .await
    }
}

impl<S, F, R> CachedMethod<S, F, R> {
    pub fn handle(&self) -> Arc<CallInterceptor> {
        Arc::clone(&self.interceptor)
    }
}

impl<S, F, R> Deref for CachedMethod<S, F, R> {
    type Target = CallInterceptor;

    fn deref(&self) -> &CallInterceptor {
        &self.interceptor
    }
}

// == Cache Builder ==
/// Configures and wraps a function or method.
///
/// Defaults: no TTL, no size bound, no partitioning, in-memory backend,
/// shared hasher, registered with [`Registry::global`], writes following
/// the process-wide enable switch.
pub struct CacheBuilder {
    name: String,
    config: EngineConfig,
    backend: Option<Box<dyn StorageBackend>>,
    clock: Option<Arc<dyn Clock>>,
    hasher: Option<Arc<ArgumentHasher>>,
    registry: Option<Registry>,
}

impl CacheBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: EngineConfig::default(),
            backend: None,
            clock: None,
            hasher: None,
            registry: Some(Registry::global()),
        }
    }

    /// Replaces the whole engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.with_ttl(ttl);
        self
    }

    /// TTL in seconds; `<= 0` disables expiry.
    pub fn ttl_seconds(mut self, seconds: i64) -> Self {
        self.config.ttl = (seconds > 0).then(|| Duration::from_secs(seconds as u64));
        self
    }

    /// Size bound; `0` means unbounded.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.config = self.config.with_max_size(max_size);
        self
    }

    pub fn partition(mut self, selector: PartitionSelector) -> Self {
        self.config.partition = selector;
        self
    }

    pub fn partition_by_index(self, index: usize) -> Self {
        self.partition(PartitionSelector::Positional(index))
    }

    pub fn partition_by_keyword(self, name: impl Into<String>) -> Self {
        self.partition(PartitionSelector::Keyword(name.into()))
    }

    /// Overrides the process-wide enable switch for this cache.
    pub fn writes_enabled(mut self, enabled: bool) -> Self {
        self.config.writes_enabled = enabled;
        self
    }

    pub fn backend(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn boxed_backend(mut self, backend: Box<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Uses a dedicated hasher instead of the shared one.
    pub fn hasher(mut self, hasher: Arc<ArgumentHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Skips registration entirely.
    pub fn unregistered(mut self) -> Self {
        self.registry = None;
        self
    }

    fn build(self, owner: Option<String>) -> Arc<CallInterceptor> {
        let backend = self
            .backend
            .unwrap_or_else(|| Box::new(crate::backend::InMemoryBackend::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let engine = CacheEngine::with_clock(backend, self.config, clock);

        let interceptor = Arc::new(CallInterceptor {
            name: self.name,
            owner,
            engine: Arc::new(engine),
            hasher: self.hasher.unwrap_or_else(ArgumentHasher::shared),
            stats: Mutex::new(WrapperStats::new()),
        });

        if let Some(registry) = self.registry {
            let handle: Arc<dyn CacheHandle> = interceptor.clone();
            registry.register(&handle);
        }

        interceptor
    }

    /// Wraps a free function taking its arguments as [`CallArgs`].
    pub fn wrap_function<F, Fut, R>(self, target: F) -> CachedFunction<F, R>
    where
        F: Fn(CallArgs) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
        R: Serialize + DeserializeOwned,
    {
        CachedFunction {
            interceptor: self.build(None),
            target,
            _result: PhantomData,
        }
    }

    /// Wraps a method of the type named `owner`.
    pub fn wrap_method<S, F, Fut, R>(
        self,
        owner: impl Into<String>,
        target: F,
    ) -> CachedMethod<S, F, R>
    where
        S: Serialize,
        F: Fn(Arc<S>, CallArgs) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
        R: Serialize + DeserializeOwned,
    {
        CachedMethod {
            interceptor: self.build(Some(owner.into())),
            target,
            _marker: PhantomData,
        }
    }
}

/// Wraps a free function with default settings.
pub fn wrap_function<F, Fut, R>(name: impl Into<String>, target: F) -> CachedFunction<F, R>
where
    F: Fn(CallArgs) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
    R: Serialize + DeserializeOwned,
{
    CacheBuilder::new(name).wrap_function(target)
}

/// Wraps a method with default settings.
pub fn wrap_method<S, F, Fut, R>(
    owner: impl Into<String>,
    name: impl Into<String>,
    target: F,
) -> CachedMethod<S, F, R>
where
    S: Serialize,
    F: Fn(Arc<S>, CallArgs) -> Fut,
    Fut: Future<Output = anyhow::Result<R>>,
    R: Serialize + DeserializeOwned,
{
    CacheBuilder::new(name).wrap_method(owner, target)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn builder(name: &str) -> CacheBuilder {
        CacheBuilder::new(name)
            .registry(Registry::new())
            .hasher(Arc::new(ArgumentHasher::default()))
            .writes_enabled(true)
    }

    #[tokio::test]
    async fn test_add_scenario() {
        let add = builder("add").wrap_function(|args: CallArgs| async move {
            Ok(args.arg_as::<i64>(0)? + args.arg_as::<i64>(1)?)
        });

        let (value, outcome) = add.invoke_traced(CallArgs::new().arg(1).arg(2)).await.unwrap();
        assert_eq!((value, outcome), (3, CacheOutcome::Miss));

        let (value, outcome) = add.invoke_traced(CallArgs::new().arg(1).arg(2)).await.unwrap();
        assert_eq!((value, outcome), (3, CacheOutcome::Hit));

        let (value, outcome) = add.invoke_traced(CallArgs::new().arg(2).arg(2)).await.unwrap();
        assert_eq!((value, outcome), (4, CacheOutcome::Miss));
        assert_eq!(add.size().await.unwrap(), 2);

        add.clear_all().await.unwrap();
        assert_eq!(add.size().await.unwrap(), 0);

        let (_, outcome) = add.invoke_traced(CallArgs::new().arg(2).arg(2)).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
    }

    #[tokio::test]
    async fn test_target_runs_once_per_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let square = builder("square").wrap_function(move |args: CallArgs| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let n: i64 = args.arg_as(0)?;
                Ok(n * n)
            }
        });

        for _ in 0..5 {
            assert_eq!(square.invoke(CallArgs::new().arg(9)).await.unwrap(), 81);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(square.stats().hits, 4);
        assert_eq!(square.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_failed_call_is_not_cached() {
        let flaky = builder("flaky").wrap_function(|args: CallArgs| async move {
            let fail: bool = args.arg_as(0)?;
            if fail {
                anyhow::bail!("upstream refused");
            }
            Ok("ok".to_string())
        });

        let result = flaky.invoke(CallArgs::new().arg(true)).await;
        assert!(matches!(result, Err(CacheError::Call(_))));
        assert_eq!(flaky.size().await.unwrap(), 0);
        assert_eq!(flaky.stats(), WrapperStats::default());
    }

    #[tokio::test]
    async fn test_non_round_trippable_result_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let ratio = builder("ratio").wrap_function(move |_args: CallArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(0.0f64 / 0.0) }
        });

        for _ in 0..2 {
            let (value, outcome) = ratio.invoke_traced(CallArgs::new()).await.unwrap();
            assert!(value.is_nan());
            assert_eq!(outcome, CacheOutcome::Miss);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(ratio.size().await.unwrap(), 0);
        assert_eq!(ratio.stats().misses, 2);
    }

    #[tokio::test]
    async fn test_nan_inside_option_is_not_stored_as_none() {
        let cached = builder("maybe").wrap_function(|_args: CallArgs| async move {
            Ok(Some(f64::INFINITY))
        });

        assert_eq!(cached.invoke(CallArgs::new()).await.unwrap(), Some(f64::INFINITY));
        assert_eq!(cached.invoke(CallArgs::new()).await.unwrap(), Some(f64::INFINITY));
        assert_eq!(cached.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_finite_argument_is_unhashable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cached = builder("non_finite").wrap_function(move |_args: CallArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(0) }
        });

        cached.invoke(CallArgs::new().arg(None::<f64>)).await.unwrap();
        for value in [f64::NAN, f64::INFINITY] {
            let result = cached.invoke(CallArgs::new().arg(value)).await;
            assert!(matches!(result, Err(CacheError::UnhashableInput(_))));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.stats().hits, 0);
    }

    #[tokio::test]
    async fn test_unhashable_arguments_abort_before_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let cached = builder("unhashable").wrap_function(move |_args: CallArgs| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(0) }
        });

        let mut map = std::collections::HashMap::new();
        map.insert((1, 1), 1);
        let result = cached.invoke(CallArgs::new().arg(&map)).await;

        assert!(matches!(result, Err(CacheError::UnhashableInput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ttl_through_interceptor() {
        let clock = Arc::new(ManualClock::new(0));
        let cached = builder("ttl")
            .ttl_seconds(5)
            .clock(clock.clone())
            .wrap_function(|_args: CallArgs| async move { Ok(1) });

        cached.invoke(CallArgs::new()).await.unwrap();
        clock.set(4_000);
        let (_, outcome) = cached.invoke_traced(CallArgs::new()).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Hit);

        clock.set(6_000);
        let (_, outcome) = cached.invoke_traced(CallArgs::new()).await.unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
    }

    #[tokio::test]
    async fn test_reset_clears_counters_store_and_hasher() {
        let hasher = Arc::new(ArgumentHasher::default());
        let cached = builder("reset")
            .hasher(hasher.clone())
            .wrap_function(|_args: CallArgs| async move { Ok(true) });

        cached.invoke(CallArgs::new().arg(1)).await.unwrap();
        cached.invoke(CallArgs::new().arg(1)).await.unwrap();
        assert!(!hasher.is_empty());

        cached.reset().await.unwrap();

        assert_eq!(cached.stats(), WrapperStats::default());
        assert_eq!(cached.size().await.unwrap(), 0);
        assert!(hasher.is_empty());
    }

    #[tokio::test]
    async fn test_clear_all_keeps_lifetime_counters() {
        let cached = builder("clear").wrap_function(|_args: CallArgs| async move { Ok(1) });

        cached.invoke(CallArgs::new()).await.unwrap();
        cached.invoke(CallArgs::new()).await.unwrap();
        cached.clear_all().await.unwrap();

        let stats = cached.stats();
        assert_eq!(stats.lifetime_hits, 1);
        assert_eq!(stats.lifetime_misses, 1);

        cached.reset_interval();
        let stats = cached.stats();
        assert_eq!((stats.hits, stats.misses), (0, 0));
        assert_eq!((stats.lifetime_hits, stats.lifetime_misses), (1, 1));
    }

    #[tokio::test]
    async fn test_info_reports_configuration() {
        let cached = builder("info")
            .ttl(Duration::from_secs(60))
            .max_size(100)
            .partition_by_keyword("user_id")
            .wrap_function(|_args: CallArgs| async move { Ok(()) });

        cached.invoke(CallArgs::new().kwarg("user_id", 1)).await.unwrap();
        let info = cached.info().await.unwrap();

        assert_eq!(info.name, "info");
        assert_eq!(info.size, 1);
        assert_eq!(info.ttl_seconds, Some(60.0));
        assert_eq!(info.max_size, Some(100));
        assert_eq!(info.partition, PartitionSelector::Keyword("user_id".to_string()));
        assert_eq!(info.stats.misses, 1);
    }

    #[tokio::test]
    async fn test_registration() {
        let registry = Registry::new();
        let cached = CacheBuilder::new("registered")
            .registry(registry.clone())
            .wrap_function(|_args: CallArgs| async move { Ok(0) });
        assert_eq!(registry.len(), 1);

        drop(cached);
        assert!(registry.is_empty());
    }
}
