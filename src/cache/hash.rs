//! Hash Table Module
//!
//! Redis-hash-like storage: each key owns a map of fields, each field with
//! its own expiry.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, Clone)]
struct HashField {
    value: Value,
    expires_at: u64,
}

impl HashField {
    fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }
}

/// Per-key field maps.
#[derive(Debug, Default)]
pub struct HashTable {
    hashes: HashMap<String, HashMap<String, HashField>>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a field, replacing any previous value and expiry.
    pub fn set(&mut self, key: &str, field: &str, value: Value, ttl_seconds: u64, now: u64) {
        let expires_at = now.saturating_add(ttl_seconds.saturating_mul(1000));
        self.hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), HashField { value, expires_at });
    }

    /// Reads a live field, dropping it if it has expired.
    pub fn get(&mut self, key: &str, field: &str, now: u64) -> Option<Value> {
        let fields = self.hashes.get_mut(key)?;
        let live = match fields.get(field) {
            Some(f) if !f.is_expired_at(now) => Some(f.value.clone()),
            Some(_) => {
                fields.remove(field);
                None
            }
            None => None,
        };
        if fields.is_empty() {
            self.hashes.remove(key);
        }
        live
    }

    /// Returns every live field of a key, dropping expired ones.
    pub fn get_all(&mut self, key: &str, now: u64) -> HashMap<String, Value> {
        let Some(fields) = self.hashes.get_mut(key) else {
            return HashMap::new();
        };
        fields.retain(|_, f| !f.is_expired_at(now));
        let out = fields
            .iter()
            .map(|(name, f)| (name.clone(), f.value.clone()))
            .collect();
        if fields.is_empty() {
            self.hashes.remove(key);
        }
        out
    }

    /// Removes a field; true iff a live field was removed.
    pub fn delete(&mut self, key: &str, field: &str, now: u64) -> bool {
        let Some(fields) = self.hashes.get_mut(key) else {
            return false;
        };
        let removed = fields
            .remove(field)
            .is_some_and(|f| !f.is_expired_at(now));
        if fields.is_empty() {
            self.hashes.remove(key);
        }
        removed
    }

    /// Removes a whole hash; true iff it held a live field.
    pub fn remove_key(&mut self, key: &str, now: u64) -> bool {
        self.hashes
            .remove(key)
            .is_some_and(|fields| fields.values().any(|f| !f.is_expired_at(now)))
    }

    /// Drops every expired field and returns how many were removed.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let mut removed = 0;
        self.hashes.retain(|_, fields| {
            let before = fields.len();
            fields.retain(|_, f| !f.is_expired_at(now));
            removed += before - fields.len();
            !fields.is_empty()
        });
        removed
    }

    pub fn clear(&mut self) {
        self.hashes.clear();
    }

    /// Number of keys holding at least one field.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut table = HashTable::new();
        table.set("dev:1", "sysName", json!("core-sw"), 60, 1_000);

        assert_eq!(table.get("dev:1", "sysName", 1_000), Some(json!("core-sw")));
        assert_eq!(table.get("dev:1", "missing", 1_000), None);
        assert_eq!(table.get("dev:2", "sysName", 1_000), None);
    }

    #[test]
    fn test_fields_expire_independently() {
        let mut table = HashTable::new();
        table.set("k", "short", json!(1), 1, 0);
        table.set("k", "long", json!(2), 10, 0);

        let all = table.get_all("k", 1_500);
        assert_eq!(all.len(), 1);
        assert_eq!(all.get("long"), Some(&json!(2)));
    }

    #[test]
    fn test_hash_disappears_with_last_field() {
        let mut table = HashTable::new();
        table.set("k", "f", json!(1), 10, 0);

        assert!(table.delete("k", "f", 0));
        assert!(table.is_empty());
        assert!(!table.delete("k", "f", 0));
    }

    #[test]
    fn test_delete_expired_field_reports_false() {
        let mut table = HashTable::new();
        table.set("k", "f", json!(1), 1, 0);
        assert!(!table.delete("k", "f", 5_000));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_key_drops_every_field() {
        let mut table = HashTable::new();
        table.set("k", "a", json!(1), 10, 0);
        table.set("k", "b", json!(2), 10, 0);
        table.set("other", "a", json!(3), 10, 0);

        assert!(table.remove_key("k", 0));
        assert!(table.get_all("k", 0).is_empty());
        assert_eq!(table.len(), 1);
        assert!(!table.remove_key("k", 0));
    }

    #[test]
    fn test_remove_key_with_only_expired_fields_reports_false() {
        let mut table = HashTable::new();
        table.set("k", "a", json!(1), 1, 0);
        assert!(!table.remove_key("k", 5_000));
        assert!(table.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let mut table = HashTable::new();
        table.set("a", "x", json!(1), 1, 0);
        table.set("a", "y", json!(1), 100, 0);
        table.set("b", "x", json!(1), 1, 0);

        assert_eq!(table.purge_expired(2_000), 2);
        assert_eq!(table.len(), 1);
    }
}
