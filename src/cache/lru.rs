//! LRU Tracker Module
//!
//! Orders keys by recency of write/read for eviction. Every touch hands out a
//! fresh sequence number, so entries touched within the same millisecond
//! still have a strict order.

use std::collections::BTreeMap;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys are stored in a BTreeMap keyed by sequence number where:
/// - First = Least recently used
/// - Last = Most recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Sequence number -> key
    order: BTreeMap<u64, String>,
    /// Next sequence number to hand out
    next_seq: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    ///
    /// `previous` is the sequence number the key held before, if any.
    /// Returns the new sequence number, which the caller stores with the entry.
    pub fn touch(&mut self, key: &str, previous: Option<u64>) -> u64 {
        if let Some(seq) = previous {
            self.order.remove(&seq);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.to_string());
        seq
    }

    // == Remove ==
    /// Removes a key's slot from the tracker.
    pub fn remove(&mut self, seq: u64) {
        self.order.remove(&seq);
    }

    // == Oldest ==
    /// Returns up to `count` keys, least recently used first.
    pub fn oldest(&self, count: usize) -> Vec<String> {
        self.order.values().take(count).cloned().collect()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_new() {
        let lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.len(), 0);
    }

    #[test]
    fn test_lru_touch_new_key() {
        let mut lru = LruTracker::new();

        lru.touch("key1", None);
        lru.touch("key2", None);
        lru.touch("key3", None);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.oldest(1), vec!["key1".to_string()]);
    }

    #[test]
    fn test_lru_touch_existing_key() {
        let mut lru = LruTracker::new();

        let a = lru.touch("a", None);
        lru.touch("b", None);
        lru.touch("c", None);

        // Touch a again - should move to the back of the eviction queue
        lru.touch("a", Some(a));

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.oldest(3), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_lru_remove() {
        let mut lru = LruTracker::new();

        lru.touch("key1", None);
        let k2 = lru.touch("key2", None);
        lru.touch("key3", None);

        lru.remove(k2);

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.oldest(5), vec!["key1", "key3"]);
    }

    #[test]
    fn test_lru_remove_unknown_slot() {
        let mut lru = LruTracker::new();
        lru.touch("key1", None);

        lru.remove(999);

        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_lru_oldest_more_than_len() {
        let mut lru = LruTracker::new();
        lru.touch("only", None);
        assert_eq!(lru.oldest(10), vec!["only"]);
    }

    #[test]
    fn test_lru_clear() {
        let mut lru = LruTracker::new();
        lru.touch("a", None);
        lru.touch("b", None);
        lru.clear();
        assert!(lru.is_empty());
    }
}
