//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::WeakMemoryCache;

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The task sleeps for `interval` between runs and exits on its own once the
/// cache it sweeps has been dropped.
///
/// # Returns
/// A JoinHandle for the spawned task, which `destroy()` aborts.
pub fn spawn_cleanup_task(cache: WeakMemoryCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(
            "Starting TTL cleanup task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, stopping TTL cleanup task");
                break;
            };

            let removed = cache.cleanup_expired().await;

            if removed > 0 {
                info!(
                    prefix = %cache.config().prefix,
                    "TTL cleanup: removed {} expired entries", removed
                );
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheManager;
    use crate::config::CacheConfig;

    fn fast_sweep_config() -> CacheConfig {
        CacheConfig {
            prefix: "sweep".into(),
            cleanup_interval_ms: 200,
            ..CacheConfig::default()
        }
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = MemoryCacheManager::new(fast_sweep_config()).unwrap();
        cache.set("expire_soon", "value", Some(1)).await;

        // Wait for entry to expire and the sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        // Physically gone, not just logically expired
        assert_eq!(cache.len().await, 0);
        cache.destroy().await;
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = MemoryCacheManager::new(fast_sweep_config()).unwrap();
        cache.set("long_lived", "value", Some(3600)).await;

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(
            cache.get::<String>("long_lived").await.as_deref(),
            Some("value")
        );
        cache.destroy().await;
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_when_cache_dropped() {
        let cache = MemoryCacheManager::new(fast_sweep_config()).unwrap();
        let handle = spawn_cleanup_task(cache.downgrade(), Duration::from_millis(50));

        drop(cache);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(handle.is_finished(), "Task should exit once the cache is gone");
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = MemoryCacheManager::new(fast_sweep_config()).unwrap();
        let handle = spawn_cleanup_task(cache.downgrade(), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
