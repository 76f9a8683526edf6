//! Optimizer Module
//!
//! Device polling support: connection pooling, a short-lived query cache,
//! adaptive batch sizing and the manager that ties them together.

mod batch;
mod device;
mod manager;
mod pool;
mod query_cache;

pub use batch::{AdaptiveBatchManager, BatchAdjustment, BatchTuning};
pub use device::{DeviceConnector, DeviceQueryResult, QueryOptions, SimulatedConnector};
pub use manager::{DeviceManagerConfig, DeviceManagerStats, HighPerformanceDeviceManager};
pub use pool::{ConnectionPool, DeviceConnection, PoolStats};
pub use query_cache::{process_resident_bytes, QueryCache, QueryCacheConfig, QueryCacheStats};
