//! Query Cache Module
//!
//! TTL map of device query results with an entry cap. Eviction removes the
//! entry with the fewest hits, unlike `MemoryCacheManager` which evicts by
//! recency. Periodic sweeps drop expired entries, and a memory-pressure check
//! clears 30% of entries when the process exceeds its ceiling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::System;
use tracing::warn;

/// Share of entries dropped when the process is over its memory ceiling
const PRESSURE_RELIEF_FRACTION: f64 = 0.3;

/// Query cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryCacheConfig {
    pub ttl_ms: u64,
    pub max_entries: usize,
    /// Process resident memory ceiling in bytes
    pub heap_ceiling_bytes: u64,
    pub sweep_interval_ms: u64,
    pub memory_check_interval_ms: u64,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 30_000,
            max_entries: 1000,
            heap_ceiling_bytes: 512 * 1024 * 1024,
            sweep_interval_ms: 60_000,
            memory_check_interval_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone)]
struct QueryEntry {
    value: Value,
    expires_at: u64,
    hits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub pressure_clears: u64,
}

// == Query Cache ==
#[derive(Debug)]
pub struct QueryCache {
    entries: HashMap<String, QueryEntry>,
    config: QueryCacheConfig,
    stats: QueryCacheStats,
}

impl QueryCache {
    pub fn new(config: QueryCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            stats: QueryCacheStats::default(),
        }
    }

    pub fn config(&self) -> &QueryCacheConfig {
        &self.config
    }

    pub fn get(&mut self, key: &str, now: u64) -> Option<Value> {
        match self.entries.get_mut(key) {
            Some(entry) if now <= entry.expires_at => {
                entry.hits += 1;
                self.stats.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.misses += 1;
                None
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Stores a result; a new key at capacity first evicts the least-hit entry.
    pub fn set(&mut self, key: &str, value: Value, now: u64) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.config.max_entries {
            self.evict_least_hit();
        }
        self.entries.insert(
            key.to_string(),
            QueryEntry {
                value,
                expires_at: now.saturating_add(self.config.ttl_ms),
                hits: 0,
            },
        );
    }

    fn evict_least_hit(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.hits)
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }

    /// Removes expired entries, returning how many were dropped.
    pub fn sweep_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| now <= e.expires_at);
        before - self.entries.len()
    }

    /// Drops 30% of entries (fewest hits first) if `resident_bytes` is over
    /// the ceiling. Returns how many were dropped.
    pub fn relieve_pressure(&mut self, resident_bytes: u64) -> usize {
        if resident_bytes <= self.config.heap_ceiling_bytes || self.entries.is_empty() {
            return 0;
        }

        let count = (self.entries.len() as f64 * PRESSURE_RELIEF_FRACTION).ceil() as usize;
        let mut by_hits: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.hits))
            .collect();
        by_hits.sort_by_key(|(_, hits)| *hits);
        for (key, _) in by_hits.into_iter().take(count) {
            self.entries.remove(&key);
        }

        self.stats.pressure_clears += 1;
        warn!(
            resident_bytes,
            ceiling = self.config.heap_ceiling_bytes,
            dropped = count,
            "Memory pressure, query cache trimmed"
        );
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> QueryCacheStats {
        QueryCacheStats {
            entries: self.entries.len(),
            ..self.stats.clone()
        }
    }
}

/// Resident memory of this process in bytes, if the platform reports it.
pub fn process_resident_bytes() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut system = System::new();
    system.refresh_process(pid);
    system.process(pid).map(|p| p.memory())
}
