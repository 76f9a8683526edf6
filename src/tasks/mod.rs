//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Rate-limit Sweep: Drops elapsed fixed windows
//! - Optimizer Maintenance: Query cache sweep, memory check, batch tuning

mod cleanup;
mod maintenance;
mod sweep;

pub use cleanup::spawn_cleanup_task;
pub use maintenance::{spawn_batch_tuner, spawn_query_cache_maintenance};
pub use sweep::spawn_rate_limit_sweep;
