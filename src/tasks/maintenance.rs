//! Optimizer Maintenance Tasks
//!
//! Query cache sweep, memory-pressure check and batch-size tuning.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::current_timestamp_ms;
use crate::optimizer::{process_resident_bytes, AdaptiveBatchManager, QueryCache};

/// Spawns the query cache expiry sweep and memory-pressure check.
///
/// Returns both handles; the caller aborts them on shutdown.
pub fn spawn_query_cache_maintenance(
    cache: Arc<Mutex<QueryCache>>,
    sweep_interval: Duration,
    memory_check_interval: Duration,
) -> Vec<JoinHandle<()>> {
    let sweep_cache = Arc::clone(&cache);
    let sweep = tokio::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            let removed = sweep_cache.lock().await.sweep_expired(current_timestamp_ms());
            if removed > 0 {
                debug!(removed, "Query cache sweep");
            }
        }
    });

    let memory = tokio::spawn(async move {
        loop {
            tokio::time::sleep(memory_check_interval).await;
            let Some(resident) = process_resident_bytes() else {
                continue;
            };
            cache.lock().await.relieve_pressure(resident);
        }
    });

    vec![sweep, memory]
}

/// Spawns the periodic batch-size adjustment.
pub fn spawn_batch_tuner(batch: Arc<Mutex<AdaptiveBatchManager>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            batch.lock().await.adjust();
        }
    })
}
