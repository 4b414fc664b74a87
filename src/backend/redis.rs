//! Redis Backend
//!
//! Stores every entry of one engine as a field of a single Redis hash named
//! after the configured namespace. Entries travel as JSON text.

use std::env;
use std::future::Future;
use std::time::Duration;

use ::redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisResult};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::backend::StorageBackend;
use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    /// Logical database index
    pub db: i64,
    /// Empty means no authentication
    pub password: String,
    /// Connect over TLS (`rediss://`)
    pub tls: bool,
    /// Hash key grouping all entries of this backend
    pub namespace: String,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: String::new(),
            tls: true,
            namespace: "callcache".to_string(),
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisConfig {
    /// Creates a RedisConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `CALLCACHE_REDIS_HOST` (default: localhost)
    /// - `CALLCACHE_REDIS_PORT` (default: 6379)
    /// - `CALLCACHE_REDIS_DB` (default: 0)
    /// - `CALLCACHE_REDIS_PASSWORD` (default: empty)
    /// - `CALLCACHE_REDIS_SSL` - `true` for TLS (default: true)
    /// - `CALLCACHE_REDIS_NAME` - namespace hash key (default: callcache)
    /// - `CALLCACHE_REDIS_CONNECT_TIMEOUT` - seconds (default: 5)
    /// - `CALLCACHE_REDIS_OPERATION_TIMEOUT` - seconds (default: 2)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("CALLCACHE_REDIS_HOST").unwrap_or(defaults.host),
            port: env::var("CALLCACHE_REDIS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            db: env::var("CALLCACHE_REDIS_DB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.db),
            password: env::var("CALLCACHE_REDIS_PASSWORD").unwrap_or(defaults.password),
            tls: env::var("CALLCACHE_REDIS_SSL")
                .map(|v| v == "true")
                .unwrap_or(defaults.tls),
            namespace: env::var("CALLCACHE_REDIS_NAME").unwrap_or(defaults.namespace),
            connect_timeout: env::var("CALLCACHE_REDIS_CONNECT_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            operation_timeout: env::var("CALLCACHE_REDIS_OPERATION_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.operation_timeout),
        }
    }

    /// Connection URL, e.g. `rediss://:secret@cache.internal:6380/2`
    pub fn connection_url(&self) -> String {
        let scheme = if self.tls { "rediss" } else { "redis" };
        let auth = if self.password.is_empty() {
            String::new()
        } else {
            format!(":{}@", self.password)
        };
        format!("{}://{}{}:{}/{}", scheme, auth, self.host, self.port, self.db)
    }
}

/// Redis-backed storage.
///
/// Keys are fields of the namespace hash (`HGET`/`HSET`/`HDEL`...), so the
/// whole cache of one engine can be dropped with a single `DEL`.
pub struct RedisBackend {
    conn: MultiplexedConnection,
    namespace: String,
    operation_timeout: Duration,
}

impl RedisBackend {
    /// Connects and clears any data already stored under the namespace.
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.connection_url())
            .map_err(|e| CacheError::BackendUnavailable(format!("Redis client error: {}", e)))?;

        let conn = timeout(
            config.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| {
            CacheError::BackendUnavailable(format!(
                "Redis connect to {}:{} timed out",
                config.host, config.port
            ))
        })?
        .map_err(|e| {
            warn!("Redis connection to {}:{} failed: {}", config.host, config.port, e);
            CacheError::BackendUnavailable(format!("Redis connection error: {}", e))
        })?;

        let mut backend = Self {
            conn,
            namespace: config.namespace,
            operation_timeout: config.operation_timeout,
        };

        let stale = backend.len().await?;
        if stale > 0 {
            info!(
                "Clearing {} stale entries under Redis namespace '{}'",
                stale, backend.namespace
            );
            backend.clear().await?;
        }

        Ok(backend)
    }

    /// Creates a backend from environment variables
    pub async fn from_env() -> Result<Self> {
        Self::connect(RedisConfig::from_env()).await
    }

    /// Runs one command under the operation timeout.
    async fn run<T>(
        &self,
        command: &str,
        fut: impl Future<Output = RedisResult<T>>,
    ) -> Result<T> {
        match timeout(self.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                warn!("Redis {} on '{}' failed: {}", command, self.namespace, e);
                Err(CacheError::BackendUnavailable(format!(
                    "Redis {} error: {}",
                    command, e
                )))
            }
            Err(_) => Err(CacheError::BackendUnavailable(format!(
                "Redis {} timed out after {:?}",
                command, self.operation_timeout
            ))),
        }
    }
}

#[async_trait]
impl StorageBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = self.run("HGET", conn.hget(&self.namespace, key)).await?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    async fn set(&mut self, key: &str, entry: CacheEntry) -> Result<()> {
        let text = serde_json::to_string(&entry)?;
        let mut conn = self.conn.clone();
        let _: () = self
            .run("HSET", conn.hset(&self.namespace, key, text))
            .await?;
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let removed: i64 = self.run("HDEL", conn.hdel(&self.namespace, key)).await?;

        if removed == 0 {
            Err(CacheError::KeyNotFound(key.to_string()))
        } else {
            Ok(())
        }
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        self.run("HEXISTS", conn.hexists(&self.namespace, key)).await
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        self.run("HLEN", conn.hlen(&self.namespace)).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        self.run("HKEYS", conn.hkeys(&self.namespace)).await
    }

    async fn clear(&mut self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = self.run("DEL", conn.del(&self.namespace)).await?;
        Ok(())
    }
}
