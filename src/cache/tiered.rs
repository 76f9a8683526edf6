//! Tiered Cache Module
//!
//! Two independent managers: a small, short-lived L1 in front of an optional
//! large L2. Reads fall through to L2 and populate L1 on an L2 hit; writes
//! fan out to both tiers.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::cache::{CacheStats, MemoryCacheManager};
use crate::config::CacheConfig;
use crate::error::Result;

/// Which tier answered a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    L1,
    L2,
}

/// Stats of both tiers side by side.
#[derive(Debug, Clone, Serialize)]
pub struct TieredStats {
    pub l1: CacheStats,
    pub l2: Option<CacheStats>,
}

// == Tiered Cache Manager ==
#[derive(Debug, Clone)]
pub struct TieredCacheManager {
    l1: MemoryCacheManager,
    l2: Option<MemoryCacheManager>,
}

impl TieredCacheManager {
    /// Builds both tiers, failing if either configuration is invalid.
    pub fn new(l1: CacheConfig, l2: Option<CacheConfig>) -> Result<Self> {
        let l1 = MemoryCacheManager::new(l1)?;
        let l2 = l2.map(MemoryCacheManager::new).transpose()?;
        info!(l2_enabled = l2.is_some(), "Tiered cache initialized");
        Ok(Self { l1, l2 })
    }

    /// Wraps existing managers.
    pub fn from_tiers(l1: MemoryCacheManager, l2: Option<MemoryCacheManager>) -> Self {
        Self { l1, l2 }
    }

    pub fn l1(&self) -> &MemoryCacheManager {
        &self.l1
    }

    pub fn l2(&self) -> Option<&MemoryCacheManager> {
        self.l2.as_ref()
    }

    // == Get ==
    /// Reads through L1 then L2, deserializing into `T`.
    ///
    /// A value that does not fit `T` is counted as an error on the tier that
    /// answered.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let (value, tier) = self.get_with_tier(key).await?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                self.tier(tier).record_failure("get", key, e.into()).await;
                None
            }
        }
    }

    fn tier(&self, tier: CacheTier) -> &MemoryCacheManager {
        match tier {
            CacheTier::L2 => self.l2.as_ref().unwrap_or(&self.l1),
            CacheTier::L1 => &self.l1,
        }
    }

    /// Reads the raw value through L1 then L2.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        self.get_with_tier(key).await.map(|(value, _)| value)
    }

    /// Reads through both tiers and reports which one answered.
    ///
    /// An L2 hit is written back into L1 with L1's default TTL.
    pub async fn get_with_tier(&self, key: &str) -> Option<(Value, CacheTier)> {
        if let Some(value) = self.l1.get_value(key).await {
            return Some((value, CacheTier::L1));
        }

        let l2 = self.l2.as_ref()?;
        let value = l2.get_value(key).await?;
        debug!(key, "L2 hit, populating L1");
        self.l1.set_value(key, value.clone(), None, None).await;
        Some((value, CacheTier::L2))
    }

    // == Set ==
    /// Writes to both tiers concurrently; succeeds only if every present tier
    /// succeeds.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<u64>) -> bool {
        match &self.l2 {
            Some(l2) => {
                let (l1_ok, l2_ok) =
                    tokio::join!(self.l1.set(key, value, ttl), l2.set(key, value, ttl));
                l1_ok && l2_ok
            }
            None => self.l1.set(key, value, ttl).await,
        }
    }

    // == Delete ==
    /// Removes from both tiers; true if either tier held the key.
    pub async fn del(&self, key: &str) -> bool {
        match &self.l2 {
            Some(l2) => {
                let (l1_removed, l2_removed) = tokio::join!(self.l1.del(key), l2.del(key));
                l1_removed || l2_removed
            }
            None => self.l1.del(key).await,
        }
    }

    /// True if either tier holds a live entry.
    pub async fn exists(&self, key: &str) -> bool {
        if self.l1.exists(key).await {
            return true;
        }
        match &self.l2 {
            Some(l2) => l2.exists(key).await,
            None => false,
        }
    }

    /// Live keys matching a pattern across both tiers, sorted and deduplicated.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        let mut keys = self.l1.keys(pattern).await;
        if let Some(l2) = &self.l2 {
            keys.extend(l2.keys(pattern).await);
        }
        keys.sort();
        keys.dedup();
        keys
    }

    pub async fn clear(&self) {
        self.l1.clear().await;
        if let Some(l2) = &self.l2 {
            l2.clear().await;
        }
    }

    pub async fn stats(&self) -> TieredStats {
        let l2 = match &self.l2 {
            Some(l2) => Some(l2.get_stats().await),
            None => None,
        };
        TieredStats {
            l1: self.l1.get_stats().await,
            l2,
        }
    }

    pub async fn ping(&self) -> &'static str {
        self.l1.ping().await
    }

    // == Destroy ==
    /// Tears down both tiers.
    pub async fn destroy(&self) {
        self.l1.destroy().await;
        if let Some(l2) = &self.l2 {
            l2.destroy().await;
        }
    }
}
