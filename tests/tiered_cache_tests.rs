//! Integration Tests for the cache library
//!
//! Exercises `MemoryCacheManager` and `TieredCacheManager` through the
//! public API only.

use std::time::Duration;

use netmon_cache::cache::{CacheEvent, CacheTier};
use netmon_cache::{CacheConfig, MemoryCacheManager, TieredCacheManager};
use serde::{Deserialize, Serialize};
use serde_json::json;

// == Helper Functions ==

fn config(prefix: &str, max_memory_mb: f64) -> CacheConfig {
    CacheConfig {
        prefix: prefix.into(),
        default_ttl: 300,
        max_memory_mb,
        ..CacheConfig::default()
    }
}

/// Budget in MB holding exactly `n` entries of `"xx"` (8 bytes each)
fn budget_for(n: usize) -> f64 {
    (n * 8) as f64 / (1024.0 * 1024.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
    n: u32,
}

// == Expiry ==

#[tokio::test]
async fn test_expiry_counts_one_miss() {
    let cache = MemoryCacheManager::new(config("expiry", 100.0)).unwrap();

    assert!(cache.set("a", &Reading { n: 1 }, Some(1)).await);
    assert_eq!(cache.get::<Reading>("a").await, Some(Reading { n: 1 }));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let misses_before = cache.get_stats().await.misses;
    assert_eq!(cache.get::<Reading>("a").await, None);
    assert_eq!(cache.get_stats().await.misses, misses_before + 1);
    assert!(!cache.exists("a").await);
}

// == Eviction ==

#[tokio::test]
async fn test_tiny_budget_forces_eviction() {
    let cache = MemoryCacheManager::new(config("tiny", 0.001)).unwrap();

    for i in 0..100 {
        let value = json!({"n": i, "label": "interface-counter"});
        cache.set(&format!("k{}", i), &value, None).await;
    }

    let stats = cache.get_stats().await;
    assert!(stats.evictions > 0);
    assert!(stats.key_count < 100);
    assert!(stats.memory_usage as f64 <= 0.001 * 1024.0 * 1024.0 + 100.0);
}

#[tokio::test]
async fn test_eviction_prefers_least_recently_accessed() {
    let cache = MemoryCacheManager::new(config("lru", budget_for(3))).unwrap();
    let mut events = cache.subscribe();

    cache.set("A", "xx", None).await;
    cache.set("B", "xx", None).await;
    cache.set("C", "xx", None).await;
    cache.get::<String>("A").await;

    cache.set("D", "xx", None).await;

    assert!(cache.exists("A").await);
    assert!(!cache.exists("B").await);
    assert!(cache.exists("C").await);
    assert!(cache.exists("D").await);

    let mut saw_eviction = false;
    while let Ok(event) = events.try_recv() {
        if event == (CacheEvent::Eviction { count: 1 }) {
            saw_eviction = true;
        }
    }
    assert!(saw_eviction);
}

// == Delete ==

#[tokio::test]
async fn test_delete_absent_key_is_not_an_error() {
    let cache = MemoryCacheManager::new(config("del", 100.0)).unwrap();

    assert!(!cache.del("ghost").await);
    assert_eq!(cache.get_stats().await.errors, 0);
}

// == Patterns ==

#[tokio::test]
async fn test_keys_pattern_semantics() {
    let cache = MemoryCacheManager::new(config("pattern", 100.0)).unwrap();
    for key in ["user:1", "user:abc", "users:1", "user", "user.1", "userX1"] {
        cache.set(key, &1, None).await;
    }

    assert_eq!(cache.keys("user:*").await, vec!["user:1", "user:abc"]);
    assert_eq!(cache.keys("user.?").await, vec!["user.1"]);
}

// == Tiered ==

#[tokio::test]
async fn test_tiered_read_through_populates_l1() {
    let cache = TieredCacheManager::new(config("t:l1", 16.0), Some(config("t:l2", 256.0))).unwrap();
    cache.l2().unwrap().set("K", &Reading { n: 7 }, None).await;

    let (value, tier) = cache.get_with_tier("K").await.unwrap();
    assert_eq!(value, json!({"n": 7}));
    assert_eq!(tier, CacheTier::L2);

    assert_eq!(cache.l1().get::<Reading>("K").await, Some(Reading { n: 7 }));
    cache.destroy().await;
}

#[tokio::test]
async fn test_tiered_write_and_delete_fan_out() {
    let cache = TieredCacheManager::new(config("f:l1", 16.0), Some(config("f:l2", 256.0))).unwrap();

    assert!(cache.set("k", &Reading { n: 1 }, Some(60)).await);
    assert!(cache.l1().exists("k").await);
    assert!(cache.l2().unwrap().exists("k").await);

    assert!(cache.del("k").await);
    assert!(!cache.exists("k").await);
    cache.destroy().await;
}

#[tokio::test]
async fn test_tiers_expire_independently() {
    let l1 = CacheConfig {
        default_ttl: 1,
        ..config("x:l1", 16.0)
    };
    let cache = TieredCacheManager::new(l1, Some(config("x:l2", 256.0))).unwrap();
    cache.set("k", "v", None).await;

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(!cache.l1().exists("k").await);
    assert_eq!(cache.get_with_tier("k").await.map(|(_, t)| t), Some(CacheTier::L2));
    assert!(cache.l1().exists("k").await);
}

// == Lifecycle ==

#[tokio::test]
async fn test_destroy_leaves_an_empty_cache() {
    let cache = MemoryCacheManager::new(config("life", 100.0)).unwrap();
    cache.set("k", "v", None).await;

    cache.destroy().await;

    assert_eq!(cache.get::<String>("k").await, None);
    assert_eq!(cache.len().await, 0);
}
