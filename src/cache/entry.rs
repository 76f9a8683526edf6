//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL, size and
//! access metadata.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation / last refresh timestamp (Unix milliseconds)
    pub timestamp: u64,
    /// Relative lifespan in milliseconds
    pub ttl_ms: u64,
    /// Opaque token distinguishing successive writes of the same key
    pub version: String,
    /// Caller-supplied annotation, opaque to the cache
    pub metadata: Option<HashMap<String, Value>>,
    /// Estimated size in bytes
    pub size: usize,
    /// Number of successful reads
    pub access_count: u64,
    /// Timestamp of the last successful read (Unix milliseconds)
    pub last_accessed: u64,
    /// Position in the recency order, see `LruTracker`
    pub(crate) recency: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl_seconds` - Lifespan in seconds
    /// * `metadata` - Optional caller annotation
    pub fn new(value: Value, ttl_seconds: u64, metadata: Option<HashMap<String, Value>>) -> Self {
        let now = current_timestamp_ms();
        let size = estimate_size(&value);

        Self {
            value,
            timestamp: now,
            ttl_ms: ttl_seconds.saturating_mul(1000),
            version: new_version(now),
            metadata,
            size,
            access_count: 0,
            last_accessed: now,
            recency: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once `now > timestamp + ttl`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as `is_expired` against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at()
    }

    /// Absolute expiry time in Unix milliseconds.
    pub fn expires_at(&self) -> u64 {
        self.timestamp.saturating_add(self.ttl_ms)
    }

    // == Time To Live ==
    /// Returns remaining lifespan in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at().saturating_sub(current_timestamp_ms())
    }

    /// Returns remaining lifespan in whole seconds, floored.
    pub fn ttl_remaining(&self) -> u64 {
        self.ttl_remaining_ms() / 1000
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now: u64) {
        self.access_count += 1;
        self.last_accessed = now;
    }

    // == Refresh ==
    /// Rewrites the ttl and restarts the countdown from now.
    pub fn refresh(&mut self, ttl_seconds: u64) {
        self.ttl_ms = ttl_seconds.saturating_mul(1000);
        self.timestamp = current_timestamp_ms();
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Rough UTF-16 size estimate: twice the serialized length.
pub fn estimate_size(value: &Value) -> usize {
    value.to_string().len() * 2
}

fn new_version(now: u64) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", to_base36(now), &suffix[..8])
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new(json!("test_value"), 60, None);

        assert_eq!(entry.value, json!("test_value"));
        assert_eq!(entry.ttl_ms, 60_000);
        assert_eq!(entry.access_count, 0);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_entry_size_estimate() {
        let entry = CacheEntry::new(json!({"n": 1}), 60, None);
        // {"n":1} is 7 characters
        assert_eq!(entry.size, 14);
    }

    #[test]
    fn test_entry_expiration() {
        let entry = CacheEntry::new(json!("v"), 1, None);

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(1100));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let mut entry = CacheEntry::new(json!("v"), 0, None);
        entry.timestamp = now;

        // Expired strictly after timestamp + ttl
        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(now + 1));
    }

    #[test]
    fn test_ttl_remaining_seconds() {
        let entry = CacheEntry::new(json!("v"), 10, None);

        let remaining = entry.ttl_remaining();
        assert!(remaining <= 10);
        assert!(remaining >= 9);
    }

    #[test]
    fn test_refresh_restarts_countdown() {
        let mut entry = CacheEntry::new(json!("v"), 1, None);
        entry.timestamp -= 5_000;
        assert!(entry.is_expired());

        entry.refresh(10);
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining() >= 9);
    }

    #[test]
    fn test_versions_differ() {
        let a = CacheEntry::new(json!(1), 10, None);
        let b = CacheEntry::new(json!(1), 10, None);
        assert_ne!(a.version, b.version);
        assert!(a.version.contains('-'));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
