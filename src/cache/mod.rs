//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, memory-budget LRU
//! eviction, two-tier composition and scheduled prewarming.

mod entry;
mod events;
mod hash;
mod lru;
mod pattern;
mod prewarm;
mod stats;
mod store;
mod tiered;


// Re-export public types
pub use entry::{current_timestamp_ms, estimate_size, CacheEntry};
pub use events::{CacheEvent, EventBus, EVENT_CHANNEL_CAPACITY};
pub use hash::HashTable;
pub use lru::LruTracker;
pub use pattern::compile_pattern;
pub use prewarm::{PrewarmConfig, PrewarmLoader};
pub use stats::{CacheMetrics, CacheStats, StatsRecorder, RESPONSE_TIME_WINDOW};
pub use store::{MemoryCacheManager, WeakMemoryCache};
pub use tiered::{CacheTier, TieredCacheManager, TieredStats};
