//! High Performance Device Manager
//!
//! Queries many devices in adaptively sized batches. Each device query goes
//! through the query cache, then the connection pool, then the connector.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::current_timestamp_ms;
use crate::error::{CacheError, Result};
use crate::optimizer::batch::{AdaptiveBatchManager, BatchTuning};
use crate::optimizer::device::{DeviceConnector, DeviceQueryResult, QueryOptions};
use crate::optimizer::pool::{ConnectionPool, DeviceConnection, PoolStats};
use crate::optimizer::query_cache::{QueryCache, QueryCacheConfig, QueryCacheStats};
use crate::tasks::{spawn_batch_tuner, spawn_query_cache_maintenance};

/// Device manager settings.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceManagerConfig {
    pub pool_size: usize,
    pub query_cache: QueryCacheConfig,
    pub batch: BatchTuning,
}

impl Default for DeviceManagerConfig {
    fn default() -> Self {
        Self {
            pool_size: 50,
            query_cache: QueryCacheConfig::default(),
            batch: BatchTuning::default(),
        }
    }
}

impl DeviceManagerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(CacheError::InvalidConfig("pool_size must be positive".into()));
        }
        if self.query_cache.max_entries == 0 {
            return Err(CacheError::InvalidConfig(
                "query cache max_entries must be positive".into(),
            ));
        }
        if self.query_cache.sweep_interval_ms == 0 || self.query_cache.memory_check_interval_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "query cache intervals must be positive".into(),
            ));
        }
        self.batch.validate()
    }
}

/// Snapshot of every optimizer component.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceManagerStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub batch_size: usize,
    pub pool: PoolStats,
    pub query_cache: QueryCacheStats,
}

// == Device Manager ==
#[derive(Clone)]
pub struct HighPerformanceDeviceManager {
    connector: Arc<dyn DeviceConnector>,
    pool: Arc<Mutex<ConnectionPool>>,
    query_cache: Arc<Mutex<QueryCache>>,
    batch: Arc<Mutex<AdaptiveBatchManager>>,
    total_queries: Arc<AtomicU64>,
    failed_queries: Arc<AtomicU64>,
    tasks: Arc<StdMutex<Vec<JoinHandle<()>>>>,
}

impl HighPerformanceDeviceManager {
    pub fn new(config: DeviceManagerConfig, connector: Arc<dyn DeviceConnector>) -> Result<Self> {
        config.validate()?;
        info!(
            pool_size = config.pool_size,
            batch_size = config.batch.initial_size,
            query_ttl_ms = config.query_cache.ttl_ms,
            "Device manager initialized"
        );
        Ok(Self {
            connector,
            pool: Arc::new(Mutex::new(ConnectionPool::new(config.pool_size))),
            query_cache: Arc::new(Mutex::new(QueryCache::new(config.query_cache))),
            batch: Arc::new(Mutex::new(AdaptiveBatchManager::new(config.batch))),
            total_queries: Arc::new(AtomicU64::new(0)),
            failed_queries: Arc::new(AtomicU64::new(0)),
            tasks: Arc::new(StdMutex::new(Vec::new())),
        })
    }

    /// Spawns the query cache sweep, memory check and batch tuner.
    pub async fn start_maintenance(&self) {
        let (sweep_every, memory_every) = {
            let qc = self.query_cache.lock().await;
            (
                Duration::from_millis(qc.config().sweep_interval_ms),
                Duration::from_millis(qc.config().memory_check_interval_ms),
            )
        };
        let tune_every = Duration::from_millis(self.batch.lock().await.tuning().adjust_interval_ms);

        let mut handles =
            spawn_query_cache_maintenance(Arc::clone(&self.query_cache), sweep_every, memory_every);
        handles.push(spawn_batch_tuner(Arc::clone(&self.batch), tune_every));

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.extend(handles);
    }

    // == Query ==
    /// Queries every device, batch by batch, preserving input order.
    ///
    /// Each batch runs concurrently; its throughput feeds the batch tuner.
    pub async fn query_devices(&self, device_ids: &[String], options: &QueryOptions) -> Vec<DeviceQueryResult> {
        let mut results = Vec::with_capacity(device_ids.len());
        let mut start = 0;

        while start < device_ids.len() {
            let size = self.batch.lock().await.batch_size().max(1);
            let end = (start + size).min(device_ids.len());
            let chunk = &device_ids[start..end];

            let started = Instant::now();
            let outcomes = join_all(chunk.iter().map(|id| self.query_device(id, options))).await;
            self.batch.lock().await.record(chunk.len(), started.elapsed());

            debug!(batch = chunk.len(), "Device batch completed");
            results.extend(outcomes);
            start = end;
        }

        results
    }

    /// Queries one device. Failures are reported in the result, never raised.
    pub async fn query_device(&self, device_id: &str, options: &QueryOptions) -> DeviceQueryResult {
        let started = Instant::now();
        self.total_queries.fetch_add(1, Ordering::Relaxed);
        let cache_key = options.cache_key(device_id);

        if options.use_cache {
            let cached = self.query_cache.lock().await.get(&cache_key, current_timestamp_ms());
            if let Some(data) = cached {
                return DeviceQueryResult::ok(device_id, data, true, elapsed_ms(started));
            }
        }

        match self.fetch(device_id, options).await {
            Ok(data) => {
                if options.use_cache {
                    self.query_cache
                        .lock()
                        .await
                        .set(&cache_key, data.clone(), current_timestamp_ms());
                }
                let elapsed = elapsed_ms(started);
                self.pool.lock().await.record_response_time(elapsed);
                DeviceQueryResult::ok(device_id, data, false, elapsed)
            }
            Err(e) => {
                self.failed_queries.fetch_add(1, Ordering::Relaxed);
                warn!(device_id, error = %e, "Device query failed");
                DeviceQueryResult::failed(device_id, e.to_string(), elapsed_ms(started))
            }
        }
    }

    async fn fetch(&self, device_id: &str, options: &QueryOptions) -> Result<Value> {
        let conn = self.connection(device_id).await?;
        let query = self.connector.query(&conn, options);

        let outcome = match options.timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), query)
                .await
                .map_err(|_| CacheError::Device(format!("query timed out after {}ms", ms)))?,
            None => query.await,
        };

        outcome.map_err(|e| CacheError::Device(e.to_string()))
    }

    /// Pooled connection for a device, connecting on a miss.
    async fn connection(&self, device_id: &str) -> Result<DeviceConnection> {
        if let Some(conn) = self.pool.lock().await.checkout(device_id) {
            return Ok(conn);
        }

        let conn = self
            .connector
            .connect(device_id)
            .await
            .map_err(|e| CacheError::Device(e.to_string()))?;
        Ok(self.pool.lock().await.insert(conn))
    }

    pub async fn batch_size(&self) -> usize {
        self.batch.lock().await.batch_size()
    }

    pub async fn stats(&self) -> DeviceManagerStats {
        DeviceManagerStats {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            batch_size: self.batch.lock().await.batch_size(),
            pool: self.pool.lock().await.stats(),
            query_cache: self.query_cache.lock().await.stats(),
        }
    }

    // == Shutdown ==
    /// Stops background tasks and drops pooled connections and cached results.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.drain(..).collect()
        };
        for handle in handles {
            handle.abort();
        }
        self.pool.lock().await.clear();
        self.query_cache.lock().await.clear();
        info!("Device manager shut down");
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
