//! Cache Store Module
//!
//! `MemoryCacheManager`: prefixed key-value storage with TTL expiry,
//! memory-budget LRU eviction, a Redis-hash facade, lifecycle events and a
//! background expiry sweep.
//!
//! No runtime operation returns an error. Faults are counted in
//! `stats.errors`, published as `CacheEvent::Error` and turned into
//! `None`/`false`/empty results.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{
    compile_pattern, current_timestamp_ms, CacheEntry, CacheEvent, CacheMetrics, CacheStats,
    EventBus, HashTable, LruTracker, StatsRecorder,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_cleanup_task;

/// Fraction of entries removed by one eviction cycle
const EVICTION_FRACTION: f64 = 0.1;

// == Cache State ==
/// Everything guarded by the manager's lock.
#[derive(Debug, Default)]
struct CacheState {
    /// Prefixed key -> entry
    entries: HashMap<String, CacheEntry>,
    /// Recency order for eviction
    lru: LruTracker,
    /// Hash facade storage (prefixed keys)
    hashes: HashTable,
    /// Counters
    stats: StatsRecorder,
    /// Running sum of entry sizes
    memory_usage: usize,
}

impl CacheState {
    fn insert(&mut self, key: String, mut entry: CacheEntry) {
        let previous = self.entries.remove(&key);
        let prev_seq = previous.as_ref().map(|old| {
            self.memory_usage = self.memory_usage.saturating_sub(old.size);
            old.recency
        });
        entry.recency = self.lru.touch(&key, prev_seq);
        self.memory_usage += entry.size;
        self.entries.insert(key, entry);
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(entry.recency);
        self.memory_usage = self.memory_usage.saturating_sub(entry.size);
        Some(entry)
    }

    /// Removes the least recently used 10% of entries, rounded up.
    fn evict(&mut self) -> usize {
        let count = (self.entries.len() as f64 * EVICTION_FRACTION).ceil() as usize;
        let victims = self.lru.oldest(count);
        for key in &victims {
            self.remove(key);
        }
        if !victims.is_empty() {
            self.stats.record_eviction();
        }
        victims.len()
    }

    fn purge_expired(&mut self, now: u64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len() + self.hashes.purge_expired(now)
    }

    fn recompute_memory(&mut self) {
        self.memory_usage = self.entries.values().map(|e| e.size).sum();
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.hashes.clear();
        self.memory_usage = 0;
    }
}

#[derive(Debug, Default)]
pub(crate) struct BackgroundTasks {
    cleanup: Option<JoinHandle<()>>,
    prewarm: HashMap<String, JoinHandle<()>>,
}

#[derive(Debug)]
struct ManagerInner {
    config: CacheConfig,
    state: RwLock<CacheState>,
    events: EventBus,
    tasks: Mutex<BackgroundTasks>,
}

// == Memory Cache Manager ==
/// Process-local cache handle. Cloning shares the same underlying cache.
#[derive(Debug, Clone)]
pub struct MemoryCacheManager {
    inner: Arc<ManagerInner>,
}

/// Non-owning handle held by background tasks.
#[derive(Debug, Clone)]
pub struct WeakMemoryCache {
    inner: Weak<ManagerInner>,
}

impl WeakMemoryCache {
    pub fn upgrade(&self) -> Option<MemoryCacheManager> {
        self.inner.upgrade().map(|inner| MemoryCacheManager { inner })
    }
}

impl MemoryCacheManager {
    // == Constructor ==
    /// Validates the configuration and creates a manager.
    ///
    /// When called inside a tokio runtime the expiry sweep is started right
    /// away; it stops on `destroy()` or once every handle is dropped.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let manager = Self {
            inner: Arc::new(ManagerInner {
                config,
                state: RwLock::new(CacheState::default()),
                events: EventBus::new(),
                tasks: Mutex::new(BackgroundTasks::default()),
            }),
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            let interval = Duration::from_millis(manager.inner.config.cleanup_interval_ms);
            let handle = spawn_cleanup_task(manager.downgrade(), interval);
            manager.tasks().cleanup = Some(handle);
        } else {
            warn!(
                prefix = %manager.inner.config.prefix,
                "No tokio runtime, background cleanup disabled"
            );
        }

        info!(
            prefix = %manager.inner.config.prefix,
            default_ttl = manager.inner.config.default_ttl,
            max_memory_mb = manager.inner.config.max_memory_mb,
            "Memory cache initialized"
        );
        manager.emit(CacheEvent::Connected {
            prefix: manager.inner.config.prefix.clone(),
        });

        Ok(manager)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakMemoryCache {
        WeakMemoryCache {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribes to lifecycle events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: CacheEvent) {
        self.inner.events.emit(event);
    }

    pub(crate) fn tasks(&self) -> std::sync::MutexGuard<'_, BackgroundTasks> {
        self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.inner.config.prefix, key)
    }

    fn strip_prefix<'a>(&self, full: &'a str) -> Option<&'a str> {
        full.strip_prefix(self.inner.config.prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
    }

    fn sample(&self, started: Instant) -> Option<f64> {
        self.inner
            .config
            .enable_metrics
            .then(|| started.elapsed().as_secs_f64() * 1000.0)
    }

    /// Counts and publishes an internal failure.
    pub(crate) async fn record_failure(&self, operation: &str, key: &str, err: CacheError) {
        self.inner.state.write().await.stats.record_error();
        warn!(operation, key, error = %err, "Cache operation failed");
        self.emit(CacheEvent::Error {
            operation: operation.to_string(),
            message: err.to_string(),
        });
    }

    // == Get ==
    /// Retrieves a value by key, deserialized into `T`.
    ///
    /// Misses, expired entries and values that do not fit `T` all yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                self.record_failure("get", key, e.into()).await;
                None
            }
        }
    }

    /// Retrieves the stored JSON value by key.
    pub async fn get_value(&self, key: &str) -> Option<Value> {
        let started = Instant::now();
        let full = self.full_key(key);
        let now = current_timestamp_ms();

        let mut guard = self.inner.state.write().await;
        let state = &mut *guard;

        let expired = match state.entries.get(&full) {
            None => {
                state.stats.record_miss();
                state.stats.record_operation(self.sample(started));
                return None;
            }
            Some(entry) => entry.is_expired_at(now),
        };

        let result = if expired {
            state.remove(&full);
            state.stats.record_miss();
            None
        } else if let Some(entry) = state.entries.get_mut(&full) {
            entry.touch(now);
            entry.recency = state.lru.touch(&full, Some(entry.recency));
            state.stats.record_hit();
            Some(entry.value.clone())
        } else {
            None
        };

        state.stats.record_operation(self.sample(started));
        result
    }

    /// Retrieves the full entry (value plus metadata) without touching it.
    pub async fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        let state = self.inner.state.read().await;
        state
            .entries
            .get(&self.full_key(key))
            .filter(|e| !e.is_expired())
            .cloned()
    }

    // == Set ==
    /// Stores a value with optional TTL in seconds (default TTL otherwise).
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<u64>) -> bool {
        self.set_with_metadata(key, value, ttl, None).await
    }

    /// Stores a value together with an opaque metadata map.
    pub async fn set_with_metadata<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<u64>,
        metadata: Option<HashMap<String, Value>>,
    ) -> bool {
        match serde_json::to_value(value) {
            Ok(v) => self.set_value(key, v, ttl, metadata).await,
            Err(e) => {
                self.record_failure("set", key, e.into()).await;
                false
            }
        }
    }

    /// Stores an already-serialized value.
    ///
    /// If the projected memory usage exceeds the budget, one eviction cycle
    /// runs first. The cycle removes a flat 10% of entries regardless of how
    /// much room the new value needs, so the budget is approximate.
    pub async fn set_value(
        &self,
        key: &str,
        value: Value,
        ttl: Option<u64>,
        metadata: Option<HashMap<String, Value>>,
    ) -> bool {
        let started = Instant::now();
        let full = self.full_key(key);
        let ttl = ttl.unwrap_or(self.inner.config.default_ttl);
        let entry = CacheEntry::new(value, ttl, metadata);

        let evicted = {
            let mut state = self.inner.state.write().await;
            let projected = (state.memory_usage + entry.size) as f64;
            let evicted = if projected > self.inner.config.max_memory_bytes() {
                state.evict()
            } else {
                0
            };
            state.insert(full, entry);
            state.stats.record_operation(self.sample(started));
            evicted
        };

        if evicted > 0 {
            debug!(prefix = %self.inner.config.prefix, evicted, "Memory budget exceeded, evicted LRU entries");
            self.emit(CacheEvent::Eviction { count: evicted });
        }
        self.emit(CacheEvent::Set {
            key: key.to_string(),
        });
        true
    }

    // == Delete ==
    /// Removes a key along with any hash stored under it; true iff either
    /// held live data.
    pub async fn del(&self, key: &str) -> bool {
        let started = Instant::now();
        let full = self.full_key(key);
        let now = current_timestamp_ms();

        let removed = {
            let mut state = self.inner.state.write().await;
            let entry_removed = state
                .remove(&full)
                .is_some_and(|entry| !entry.is_expired_at(now));
            let hash_removed = state.hashes.remove_key(&full, now);
            state.stats.record_operation(self.sample(started));
            entry_removed || hash_removed
        };

        if removed {
            self.emit(CacheEvent::Deleted {
                key: key.to_string(),
            });
        }
        removed
    }

    // == Exists ==
    /// Checks for a live entry without updating access statistics.
    pub async fn exists(&self, key: &str) -> bool {
        let full = self.full_key(key);
        let now = current_timestamp_ms();
        let mut state = self.inner.state.write().await;
        match state.entries.get(&full).map(|e| e.is_expired_at(now)) {
            Some(false) => true,
            Some(true) => {
                state.remove(&full);
                false
            }
            None => false,
        }
    }

    /// Alias of `exists`.
    pub async fn has(&self, key: &str) -> bool {
        self.exists(key).await
    }

    // == Batch Operations ==
    /// Reads several keys, preserving input order.
    pub async fn mget<T: DeserializeOwned>(&self, keys: &[&str]) -> Vec<Option<T>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await);
        }
        out
    }

    /// Writes several keys independently, preserving input order.
    pub async fn mset<T: Serialize>(&self, entries: &[(&str, T)], ttl: Option<u64>) -> Vec<bool> {
        let mut out = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            out.push(self.set(key, value, ttl).await);
        }
        out
    }

    // == Clear ==
    /// Drops every entry and hash.
    pub async fn clear(&self) {
        self.inner.state.write().await.clear();
        info!(prefix = %self.inner.config.prefix, "Cache cleared");
        self.emit(CacheEvent::Cleared);
    }

    // == Keys ==
    /// Returns unprefixed live keys matching a glob pattern, sorted.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        match self.try_keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                self.record_failure("keys", pattern, e).await;
                Vec::new()
            }
        }
    }

    async fn try_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let re = compile_pattern(pattern)?;
        let now = current_timestamp_ms();
        let state = self.inner.state.read().await;
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .filter_map(|(full, _)| self.strip_prefix(full))
            .filter(|key| re.is_match(key))
            .map(str::to_string)
            .collect();
        keys.sort();
        Ok(keys)
    }

    // == Expire ==
    /// Sets a new TTL and restarts the countdown; false if the key is absent.
    pub async fn expire(&self, key: &str, ttl_seconds: u64) -> bool {
        let full = self.full_key(key);
        let now = current_timestamp_ms();
        let mut state = self.inner.state.write().await;
        match state.entries.get(&full).map(|e| e.is_expired_at(now)) {
            Some(false) => {
                if let Some(entry) = state.entries.get_mut(&full) {
                    entry.refresh(ttl_seconds);
                }
                true
            }
            Some(true) => {
                state.remove(&full);
                false
            }
            None => false,
        }
    }

    // == TTL ==
    /// Remaining lifespan in whole seconds, or -1 if absent or expired.
    pub async fn ttl(&self, key: &str) -> i64 {
        let state = self.inner.state.read().await;
        match state.entries.get(&self.full_key(key)) {
            Some(entry) if !entry.is_expired() => entry.ttl_remaining() as i64,
            _ => -1,
        }
    }

    // == Hash Facade ==
    /// Writes one field of a hash with its own TTL (default TTL otherwise).
    pub async fn hset<T: Serialize + ?Sized>(
        &self,
        key: &str,
        field: &str,
        value: &T,
        ttl: Option<u64>,
    ) -> bool {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                self.record_failure("hset", key, e.into()).await;
                return false;
            }
        };
        let ttl = ttl.unwrap_or(self.inner.config.default_ttl);
        let full = self.full_key(key);
        let mut state = self.inner.state.write().await;
        state
            .hashes
            .set(&full, field, value, ttl, current_timestamp_ms());
        state.stats.record_operation(None);
        true
    }

    /// Reads one live field of a hash.
    pub async fn hget<T: DeserializeOwned>(&self, key: &str, field: &str) -> Option<T> {
        let value = {
            let mut state = self.inner.state.write().await;
            let value = state
                .hashes
                .get(&self.full_key(key), field, current_timestamp_ms());
            if value.is_some() {
                state.stats.record_hit();
            } else {
                state.stats.record_miss();
            }
            state.stats.record_operation(None);
            value
        }?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                self.record_failure("hget", key, e.into()).await;
                None
            }
        }
    }

    /// Returns every live field of a hash.
    pub async fn hgetall(&self, key: &str) -> HashMap<String, Value> {
        let mut state = self.inner.state.write().await;
        state
            .hashes
            .get_all(&self.full_key(key), current_timestamp_ms())
    }

    /// Removes one field; true iff it was live.
    pub async fn hdel(&self, key: &str, field: &str) -> bool {
        let mut state = self.inner.state.write().await;
        state
            .hashes
            .delete(&self.full_key(key), field, current_timestamp_ms())
    }

    // == Ping ==
    pub async fn ping(&self) -> &'static str {
        "PONG"
    }

    // == Stats ==
    /// Counter snapshot with recomputed memory usage and key count.
    pub async fn get_stats(&self) -> CacheStats {
        let mut state = self.inner.state.write().await;
        state.recompute_memory();
        state.stats.snapshot(state.memory_usage, state.entries.len())
    }

    /// Alias of `get_stats`.
    pub async fn stats(&self) -> CacheStats {
        self.get_stats().await
    }

    /// Ratios plus a per-namespace key count.
    ///
    /// The namespace of a key is the text before its first `:`; keys without
    /// one are counted under `"default"`.
    pub async fn get_metrics(&self) -> CacheMetrics {
        let stats = self.get_stats().await;
        let state = self.inner.state.read().await;
        let mut namespaces = BTreeMap::new();
        for full in state.entries.keys() {
            if let Some(key) = self.strip_prefix(full) {
                let ns = key.split_once(':').map_or("default", |(ns, _)| ns);
                *namespaces.entry(ns.to_string()).or_insert(0) += 1;
            }
        }
        CacheMetrics::from_stats(stats, namespaces)
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and hash fields.
    ///
    /// Returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        let removed = {
            let mut state = self.inner.state.write().await;
            let removed = state.purge_expired(current_timestamp_ms());
            state.recompute_memory();
            removed
        };
        self.emit(CacheEvent::Cleanup { count: removed });
        removed
    }

    // == Length ==
    /// Number of physically present entries (expired ones included until swept).
    pub async fn len(&self) -> usize {
        self.inner.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // == Destroy ==
    /// Stops background tasks, drops all state and detaches event
    /// subscribers.
    pub async fn destroy(&self) {
        {
            let mut tasks = self.tasks();
            if let Some(handle) = tasks.cleanup.take() {
                handle.abort();
            }
            for (_, handle) in tasks.prewarm.drain() {
                handle.abort();
            }
        }
        self.inner.state.write().await.clear();
        self.inner.events.close();
        info!(prefix = %self.inner.config.prefix, "Memory cache destroyed");
    }
}

impl BackgroundTasks {
    pub(crate) fn replace_prewarm(&mut self, pattern: &str, handle: JoinHandle<()>) {
        if let Some(old) = self.prewarm.insert(pattern.to_string(), handle) {
            old.abort();
        }
    }

    pub(crate) fn take_prewarm(&mut self, pattern: &str) -> Option<JoinHandle<()>> {
        self.prewarm.remove(pattern)
    }
}
