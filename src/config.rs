//! Configuration Module
//!
//! Handles loading process-wide cache settings from environment variables.

use std::env;

use once_cell::sync::Lazy;
use tracing::warn;

/// Environment variable holding the cache write kill switch.
pub const ENABLE_VAR: &str = "CALLCACHE_ENABLE";

static GLOBAL: Lazy<Config> = Lazy::new(|| {
    let config = Config::from_env();
    if !config.enabled {
        warn!("{} is off: cached functions will not store new results", ENABLE_VAR);
    }
    config
});

/// Process-wide configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether engines store new results (kill switch for cache writes)
    pub enabled: bool,
    /// Capacity of the argument hash memo
    pub hash_memo_capacity: usize,
    /// HTTP port of the admin server
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CALLCACHE_ENABLE` - `1` enables cache writes, anything else disables (default: 1)
    /// - `CALLCACHE_HASH_MEMO` - Argument hash memo capacity (default: 10000)
    /// - `SERVER_PORT` - Admin server port (default: 3000)
    pub fn from_env() -> Self {
        Self {
            enabled: env::var(ENABLE_VAR)
                .map(|v| v.trim() == "1")
                .unwrap_or(true),
            hash_memo_capacity: env::var("CALLCACHE_HASH_MEMO")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v: &usize| v > 0)
                .unwrap_or(crate::cache::HASH_MEMO_CAPACITY),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }

    /// Returns the configuration read once at first use for the whole process.
    pub fn global() -> &'static Config {
        &GLOBAL
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            hash_memo_capacity: crate::cache::HASH_MEMO_CAPACITY,
            server_port: 3000,
        }
    }
}
