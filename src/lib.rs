//! Netmon Cache - in-process caching for a network monitoring backend
//!
//! TTL/LRU memory caches with tiering and prewarming, a device polling
//! optimizer, and a fixed-window rate limiter, served over HTTP.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod optimizer;
pub mod ratelimit;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{MemoryCacheManager, TieredCacheManager};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
pub use optimizer::HighPerformanceDeviceManager;
pub use ratelimit::RateLimiter;
