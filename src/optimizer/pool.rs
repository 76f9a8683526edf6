//! Connection Pool Module
//!
//! Bounded map of device id -> connection with single-entry LRU eviction,
//! a rolling hit-rate estimate and a crude response-time average.

use std::collections::HashMap;

use serde::Serialize;

use crate::cache::current_timestamp_ms;

/// Weight of history in the hit-rate estimate
const HIT_RATE_DECAY: f64 = 0.9;

// == Device Connection ==
/// Connection handle produced by a `DeviceConnector`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceConnection {
    /// Unique connection id
    pub id: String,
    pub device_id: String,
    /// Unix milliseconds
    pub created_at: u64,
    /// Unix milliseconds
    pub last_used: u64,
    pub use_count: u64,
}

impl DeviceConnection {
    pub fn new(device_id: &str) -> Self {
        let now = current_timestamp_ms();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            device_id: device_id.to_string(),
            created_at: now,
            last_used: now,
            use_count: 0,
        }
    }
}

/// Pool counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolStats {
    pub active_connections: usize,
    pub max_size: usize,
    pub created: u64,
    pub evicted: u64,
    /// Exponentially weighted, 0.0-1.0
    pub hit_rate: f64,
    /// Milliseconds
    pub average_response_time: f64,
}

// == Connection Pool ==
#[derive(Debug)]
pub struct ConnectionPool {
    connections: HashMap<String, DeviceConnection>,
    max_size: usize,
    created: u64,
    evicted: u64,
    hit_rate: f64,
    average_response_time: f64,
}

impl ConnectionPool {
    pub fn new(max_size: usize) -> Self {
        Self {
            connections: HashMap::new(),
            max_size,
            created: 0,
            evicted: 0,
            hit_rate: 0.0,
            average_response_time: 0.0,
        }
    }

    /// Looks up a pooled connection and marks it used.
    ///
    /// Every lookup feeds the hit-rate estimate: `rate = rate * 0.9 + hit * 0.1`.
    pub fn checkout(&mut self, device_id: &str) -> Option<DeviceConnection> {
        let found = self.connections.get_mut(device_id).map(|conn| {
            conn.last_used = current_timestamp_ms();
            conn.use_count += 1;
            conn.clone()
        });
        let hit = if found.is_some() { 1.0 } else { 0.0 };
        self.hit_rate = self.hit_rate * HIT_RATE_DECAY + hit * (1.0 - HIT_RATE_DECAY);
        found
    }

    /// Adds a freshly created connection, evicting the least recently used
    /// one first when the pool is full.
    pub fn insert(&mut self, mut conn: DeviceConnection) -> DeviceConnection {
        if !self.connections.contains_key(&conn.device_id) && self.connections.len() >= self.max_size {
            self.evict_lru();
        }
        conn.use_count += 1;
        self.created += 1;
        self.connections.insert(conn.device_id.clone(), conn.clone());
        conn
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .connections
            .values()
            .min_by_key(|c| (c.last_used, c.created_at))
            .map(|c| c.device_id.clone());
        if let Some(device_id) = oldest {
            self.connections.remove(&device_id);
            self.evicted += 1;
        }
    }

    /// Two-point moving average: `avg = (avg + sample) / 2`.
    pub fn record_response_time(&mut self, sample_ms: f64) {
        self.average_response_time = (self.average_response_time + sample_ms) / 2.0;
    }

    pub fn remove(&mut self, device_id: &str) -> bool {
        self.connections.remove(device_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn clear(&mut self) {
        self.connections.clear();
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active_connections: self.connections.len(),
            max_size: self.max_size,
            created: self.created,
            evicted: self.evicted,
            hit_rate: self.hit_rate,
            average_response_time: self.average_response_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(device_id: &str, last_used: u64) -> DeviceConnection {
        DeviceConnection {
            id: format!("c-{}", device_id),
            device_id: device_id.to_string(),
            created_at: 0,
            last_used,
            use_count: 0,
        }
    }

    #[test]
    fn test_checkout_miss_then_hit() {
        let mut pool = ConnectionPool::new(2);
        assert!(pool.checkout("r1").is_none());

        pool.insert(DeviceConnection::new("r1"));
        let c = pool.checkout("r1").unwrap();
        assert_eq!(c.device_id, "r1");
        assert_eq!(c.use_count, 2);
    }

    #[test]
    fn test_evicts_least_recently_used_when_full() {
        let mut pool = ConnectionPool::new(2);
        pool.insert(conn("old", 100));
        pool.insert(conn("new", 200));
        pool.insert(conn("third", 300));

        assert_eq!(pool.len(), 2);
        assert!(pool.checkout("old").is_none());
        assert!(pool.checkout("new").is_some());
        assert_eq!(pool.stats().evicted, 1);
    }

    #[test]
    fn test_hit_rate_is_exponential() {
        let mut pool = ConnectionPool::new(4);
        pool.insert(conn("a", 1));

        pool.checkout("a");
        assert!((pool.stats().hit_rate - 0.1).abs() < 1e-9);
        pool.checkout("a");
        assert!((pool.stats().hit_rate - 0.19).abs() < 1e-9);
        pool.checkout("missing");
        assert!((pool.stats().hit_rate - 0.171).abs() < 1e-9);
    }

    #[test]
    fn test_response_time_two_point_average() {
        let mut pool = ConnectionPool::new(1);
        pool.record_response_time(100.0);
        assert_eq!(pool.stats().average_response_time, 50.0);
        pool.record_response_time(50.0);
        assert_eq!(pool.stats().average_response_time, 50.0);
        pool.record_response_time(10.0);
        assert_eq!(pool.stats().average_response_time, 30.0);
    }

    #[test]
    fn test_reinsert_same_device_does_not_evict() {
        let mut pool = ConnectionPool::new(1);
        pool.insert(conn("a", 1));
        pool.insert(conn("a", 2));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.stats().evicted, 0);
    }
}
