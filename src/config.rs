//! Configuration Module
//!
//! Per-manager cache configuration (validated at construction) and the
//! application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Cache Config ==
/// Configuration for a single `MemoryCacheManager`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Namespace prepended to every key (`prefix:key`)
    pub prefix: String,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Informational: validated and carried, never read by the cache, which
    /// does not retry
    pub max_retries: u32,
    /// Informational: validated and carried, never read by the cache
    pub retry_delay_ms: u64,
    /// Informational: validated and carried; values are never compressed
    pub compression_threshold: usize,
    /// Record response-time samples
    pub enable_metrics: bool,
    /// Memory budget in megabytes; fractional values are allowed
    pub max_memory_mb: f64,
    /// Background cleanup interval in milliseconds
    pub cleanup_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: "cache".to_string(),
            default_ttl: 300,
            max_retries: 3,
            retry_delay_ms: 1000,
            compression_threshold: 1024,
            enable_metrics: true,
            max_memory_mb: 100.0,
            cleanup_interval_ms: 60_000,
        }
    }
}

impl CacheConfig {
    /// Checks every field, failing on the first invalid one.
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(CacheError::InvalidConfig("prefix cannot be empty".into()));
        }
        if self.default_ttl == 0 {
            return Err(CacheError::InvalidConfig("default_ttl must be positive".into()));
        }
        if self.retry_delay_ms == 0 {
            return Err(CacheError::InvalidConfig("retry_delay_ms must be positive".into()));
        }
        if self.compression_threshold == 0 {
            return Err(CacheError::InvalidConfig(
                "compression_threshold must be positive".into(),
            ));
        }
        if !self.max_memory_mb.is_finite() || self.max_memory_mb <= 0.0 {
            return Err(CacheError::InvalidConfig(format!(
                "max_memory_mb must be a positive number, got {}",
                self.max_memory_mb
            )));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "cleanup_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Memory budget in bytes.
    pub fn max_memory_bytes(&self) -> f64 {
        self.max_memory_mb * 1024.0 * 1024.0
    }
}

// == Application Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Fast tier
    pub l1: CacheConfig,
    /// Large tier, `None` when disabled
    pub l2: Option<CacheConfig>,
    /// Requests allowed per client per window
    pub rate_limit_requests: u32,
    /// Rate-limit window in milliseconds
    pub rate_limit_window_ms: u64,
    /// Interval of the expired-window sweep in milliseconds
    pub rate_limit_sweep_ms: u64,
    /// Initial device batch size
    pub device_batch_size: usize,
    /// Maximum pooled device connections
    pub device_pool_size: usize,
    /// Device query cache TTL in milliseconds
    pub query_cache_ttl_ms: u64,
    /// Device query cache entry cap
    pub query_cache_max_entries: usize,
    /// Process memory ceiling for the query cache pressure check
    pub heap_ceiling_mb: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_PREFIX` - Key prefix for both tiers (default: "netmon")
    /// - `L1_DEFAULT_TTL` / `L1_MAX_MEMORY_MB` - Fast tier (default: 60s, 16MB)
    /// - `L2_ENABLED` / `L2_DEFAULT_TTL` / `L2_MAX_MEMORY_MB` - Large tier (default: true, 3600s, 256MB)
    /// - `CLEANUP_INTERVAL_MS` - Expiry sweep frequency (default: 60000)
    /// - `RATE_LIMIT_REQUESTS` / `RATE_LIMIT_WINDOW_MS` / `RATE_LIMIT_SWEEP_MS` (default: 100, 60000, 60000)
    /// - `DEVICE_BATCH_SIZE` / `DEVICE_POOL_SIZE` (default: 20, 50)
    /// - `QUERY_CACHE_TTL_MS` / `QUERY_CACHE_MAX_ENTRIES` / `HEAP_CEILING_MB` (default: 30000, 1000, 512)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let prefix: String = env_or("CACHE_PREFIX", defaults.l1.prefix.clone());
        let cleanup_interval_ms = env_or("CLEANUP_INTERVAL_MS", defaults.l1.cleanup_interval_ms);

        let l1 = CacheConfig {
            prefix: format!("{}:l1", prefix),
            default_ttl: env_or("L1_DEFAULT_TTL", defaults.l1.default_ttl),
            max_memory_mb: env_or("L1_MAX_MEMORY_MB", defaults.l1.max_memory_mb),
            cleanup_interval_ms,
            ..defaults.l1.clone()
        };

        let l2 = if env_or("L2_ENABLED", true) {
            let base = defaults.l2.clone().unwrap_or_default();
            Some(CacheConfig {
                prefix: format!("{}:l2", prefix),
                default_ttl: env_or("L2_DEFAULT_TTL", base.default_ttl),
                max_memory_mb: env_or("L2_MAX_MEMORY_MB", base.max_memory_mb),
                cleanup_interval_ms,
                ..base
            })
        } else {
            None
        };

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            l1,
            l2,
            rate_limit_requests: env_or("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
            rate_limit_window_ms: env_or("RATE_LIMIT_WINDOW_MS", defaults.rate_limit_window_ms),
            rate_limit_sweep_ms: env_or("RATE_LIMIT_SWEEP_MS", defaults.rate_limit_sweep_ms),
            device_batch_size: env_or("DEVICE_BATCH_SIZE", defaults.device_batch_size),
            device_pool_size: env_or("DEVICE_POOL_SIZE", defaults.device_pool_size),
            query_cache_ttl_ms: env_or("QUERY_CACHE_TTL_MS", defaults.query_cache_ttl_ms),
            query_cache_max_entries: env_or(
                "QUERY_CACHE_MAX_ENTRIES",
                defaults.query_cache_max_entries,
            ),
            heap_ceiling_mb: env_or("HEAP_CEILING_MB", defaults.heap_ceiling_mb),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            l1: CacheConfig {
                prefix: "netmon".to_string(),
                default_ttl: 60,
                max_memory_mb: 16.0,
                ..CacheConfig::default()
            },
            l2: Some(CacheConfig {
                prefix: "netmon".to_string(),
                default_ttl: 3600,
                max_memory_mb: 256.0,
                ..CacheConfig::default()
            }),
            rate_limit_requests: 100,
            rate_limit_window_ms: 60_000,
            rate_limit_sweep_ms: 60_000,
            device_batch_size: 20,
            device_pool_size: 50,
            query_cache_ttl_ms: 30_000,
            query_cache_max_entries: 1000,
            heap_ceiling_mb: 512,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_cache_config_rejects_empty_prefix() {
        let config = CacheConfig {
            prefix: "  ".into(),
            ..CacheConfig::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_cache_config_rejects_bad_memory() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = CacheConfig {
                max_memory_mb: bad,
                ..CacheConfig::default()
            };
            assert!(config.validate().is_err(), "accepted max_memory_mb={}", bad);
        }
    }

    #[test]
    fn test_cache_config_rejects_zero_ttl_and_interval() {
        let zero_ttl = CacheConfig {
            default_ttl: 0,
            ..CacheConfig::default()
        };
        let zero_interval = CacheConfig {
            cleanup_interval_ms: 0,
            ..CacheConfig::default()
        };
        assert!(zero_ttl.validate().is_err());
        assert!(zero_interval.validate().is_err());
    }

    #[test]
    fn test_cache_config_allows_zero_retries_and_fractional_memory() {
        let config = CacheConfig {
            max_retries: 0,
            max_memory_mb: 0.001,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!((config.max_memory_bytes() - 1048.576).abs() < 1e-9);
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.l1.default_ttl, 60);
        assert!(config.l2.is_some());
        assert_eq!(config.rate_limit_requests, 100);
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("SERVER_PORT");
        env::remove_var("L2_ENABLED");
        env::remove_var("L1_DEFAULT_TTL");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.l1.default_ttl, 60);
        assert!(config.l1.validate().is_ok());
        assert!(config.l2.as_ref().is_some_and(|l2| l2.validate().is_ok()));
    }
}
