//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, errors,
//! evictions and a rolling response-time average.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

/// Number of timed operations kept for the rolling average
pub const RESPONSE_TIME_WINDOW: usize = 1000;

// == Cache Stats ==
/// Point-in-time snapshot of a manager's counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of operations that failed internally
    pub errors: u64,
    /// Number of timed operations
    pub total_operations: u64,
    /// Number of eviction cycles
    pub evictions: u64,
    /// Mean response time in milliseconds over the last window
    pub average_response_time: f64,
    /// Estimated bytes held by live entries
    pub memory_usage: usize,
    /// Current number of entries
    pub key_count: usize,
}

/// Ratios and per-namespace breakdown derived from `CacheStats`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetrics {
    pub stats: CacheStats,
    pub hit_ratio: f64,
    pub miss_ratio: f64,
    pub error_ratio: f64,
    /// Namespace (text before the first `:` of a key) -> key count
    pub namespaces: BTreeMap<String, usize>,
}

impl CacheMetrics {
    pub fn from_stats(stats: CacheStats, namespaces: BTreeMap<String, usize>) -> Self {
        let ratio = |n: u64| {
            if stats.total_operations == 0 {
                0.0
            } else {
                n as f64 / stats.total_operations as f64
            }
        };

        Self {
            hit_ratio: ratio(stats.hits),
            miss_ratio: ratio(stats.misses),
            error_ratio: ratio(stats.errors),
            stats,
            namespaces,
        }
    }
}

// == Stats Recorder ==
/// Mutable counters owned by a manager.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    hits: u64,
    misses: u64,
    errors: u64,
    total_operations: u64,
    evictions: u64,
    response_times: VecDeque<f64>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Counts an operation and, when `sample_ms` is given, feeds the rolling
    /// response-time window.
    pub fn record_operation(&mut self, sample_ms: Option<f64>) {
        self.total_operations += 1;
        if let Some(ms) = sample_ms {
            if self.response_times.len() == RESPONSE_TIME_WINDOW {
                self.response_times.pop_front();
            }
            self.response_times.push_back(ms);
        }
    }

    pub fn average_response_time(&self) -> f64 {
        if self.response_times.is_empty() {
            0.0
        } else {
            self.response_times.iter().sum::<f64>() / self.response_times.len() as f64
        }
    }

    /// Builds a snapshot with the given point-in-time gauges.
    pub fn snapshot(&self, memory_usage: usize, key_count: usize) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            errors: self.errors,
            total_operations: self.total_operations,
            evictions: self.evictions,
            average_response_time: self.average_response_time(),
            memory_usage,
            key_count,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = StatsRecorder::new().snapshot(0, 0);
        assert_eq!(stats, CacheStats::default());
    }

    #[test]
    fn test_ratios_no_operations() {
        let metrics = CacheMetrics::from_stats(CacheStats::default(), BTreeMap::new());
        assert_eq!(metrics.hit_ratio, 0.0);
        assert_eq!(metrics.miss_ratio, 0.0);
        assert_eq!(metrics.error_ratio, 0.0);
    }

    #[test]
    fn test_ratios_mixed() {
        let mut rec = StatsRecorder::new();
        rec.record_hit();
        rec.record_operation(None);
        rec.record_miss();
        rec.record_operation(None);
        rec.record_operation(None);
        rec.record_operation(None);

        let metrics = CacheMetrics::from_stats(rec.snapshot(0, 0), BTreeMap::new());
        assert_eq!(metrics.hit_ratio, 0.25);
        assert_eq!(metrics.miss_ratio, 0.25);
    }

    #[test]
    fn test_response_time_window_is_bounded() {
        let mut rec = StatsRecorder::new();
        for _ in 0..RESPONSE_TIME_WINDOW {
            rec.record_operation(Some(10.0));
        }
        assert_eq!(rec.average_response_time(), 10.0);

        // Pushing another window of 20ms samples displaces every 10ms one
        for _ in 0..RESPONSE_TIME_WINDOW {
            rec.record_operation(Some(20.0));
        }
        assert_eq!(rec.average_response_time(), 20.0);
        assert_eq!(rec.snapshot(0, 0).total_operations, 2 * RESPONSE_TIME_WINDOW as u64);
    }

    #[test]
    fn test_record_eviction() {
        let mut rec = StatsRecorder::new();
        rec.record_eviction();
        rec.record_eviction();
        assert_eq!(rec.snapshot(0, 0).evictions, 2);
    }
}
