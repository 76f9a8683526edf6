//! Rate Limiting Module
//!
//! Fixed-window request counters used to gate the HTTP routes.

mod limiter;

pub use limiter::{RateLimitDecision, RateLimiter};
