//! Fixed-Window Rate Limiter
//!
//! One counter per key. A window opens on the first request (or the first
//! request after the previous window elapsed) and closes at `reset_time`;
//! denial does not extend it.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::cache::current_timestamp_ms;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    /// Unix milliseconds
    reset_time: u64,
}

/// Result of one `check_limit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Unix milliseconds at which the window closes
    pub reset_time: u64,
}

// == Rate Limiter ==
/// Shared fixed-window counters. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    windows: Arc<DashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a request against `key` and reports whether it is allowed.
    pub fn check_limit(&self, key: &str, limit: u32, window_ms: u64) -> RateLimitDecision {
        self.check_limit_at(key, limit, window_ms, current_timestamp_ms())
    }

    pub(crate) fn check_limit_at(&self, key: &str, limit: u32, window_ms: u64, now: u64) -> RateLimitDecision {
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            reset_time: now.saturating_add(window_ms),
        });

        if now >= window.reset_time {
            *window = Window {
                count: 0,
                reset_time: now.saturating_add(window_ms),
            };
        }

        if window.count >= limit {
            debug!(key, limit, reset_time = window.reset_time, "Rate limit exceeded");
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: window.reset_time,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: limit - window.count,
            reset_time: window.reset_time,
        }
    }

    /// Drops the window for `key`. Returns whether one existed.
    pub fn reset(&self, key: &str) -> bool {
        self.windows.remove(key).is_some()
    }

    /// Drops every window whose reset time has passed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(current_timestamp_ms())
    }

    pub(crate) fn sweep_expired_at(&self, now: u64) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| now < w.reset_time);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
