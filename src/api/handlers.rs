//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::debug;

use crate::cache::TieredCacheManager;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, DeviceQueryRequest, DeviceQueryResponse, ExistsResponse, GetResponse,
    HealthResponse, KeysQuery, KeysResponse, PingResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::optimizer::{
    BatchTuning, DeviceConnector, DeviceManagerConfig, HighPerformanceDeviceManager,
    QueryCacheConfig, SimulatedConnector,
};
use crate::ratelimit::RateLimiter;

/// Per-client request budget applied by the rate-limit middleware.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub requests: u32,
    pub window_ms: u64,
}

/// Application state shared across all handlers.
///
/// Every component is a cheap clone over shared state.
#[derive(Clone)]
pub struct AppState {
    pub cache: TieredCacheManager,
    pub limiter: RateLimiter,
    pub devices: HighPerformanceDeviceManager,
    pub rate_limit: RateLimitPolicy,
}

impl AppState {
    pub fn new(
        cache: TieredCacheManager,
        limiter: RateLimiter,
        devices: HighPerformanceDeviceManager,
        rate_limit: RateLimitPolicy,
    ) -> Self {
        Self {
            cache,
            limiter,
            devices,
            rate_limit,
        }
    }

    /// Builds every component from configuration, using the simulated
    /// device connector.
    ///
    /// Must be called inside a tokio runtime so the cache cleanup tasks start.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_connector(config, Arc::new(SimulatedConnector::default()))
    }

    pub fn with_connector(config: &Config, connector: Arc<dyn DeviceConnector>) -> Result<Self> {
        let cache = TieredCacheManager::new(config.l1.clone(), config.l2.clone())?;

        let device_config = DeviceManagerConfig {
            pool_size: config.device_pool_size,
            query_cache: QueryCacheConfig {
                ttl_ms: config.query_cache_ttl_ms,
                max_entries: config.query_cache_max_entries,
                heap_ceiling_bytes: config.heap_ceiling_mb * 1024 * 1024,
                ..QueryCacheConfig::default()
            },
            batch: BatchTuning {
                initial_size: config.device_batch_size,
                ..BatchTuning::default()
            },
        };
        let devices = HighPerformanceDeviceManager::new(device_config, connector)?;

        Ok(Self::new(
            cache,
            RateLimiter::new(),
            devices,
            RateLimitPolicy {
                requests: config.rate_limit_requests,
                window_ms: config.rate_limit_window_ms,
            },
        ))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value in both tiers with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    if !state.cache.set(&req.key, &req.value, req.ttl).await {
        return Err(CacheError::Internal(format!(
            "Failed to store key '{}'",
            req.key
        )));
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Reads through L1 then L2.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let (value, tier) = state
        .cache
        .get_with_tier(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    debug!(key = %key, ?tier, "Served from cache");
    Ok(Json(GetResponse::new(key, value, tier)))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.del(&key).await {
        return Err(CacheError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /exists/:key
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<ExistsResponse> {
    let exists = state.cache.exists(&key).await;
    Json(ExistsResponse { key, exists })
}

/// Handler for GET /keys?pattern=
pub async fn keys_handler(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Json<KeysResponse> {
    let keys = state.cache.keys(&query.pattern).await;
    Json(KeysResponse::new(query.pattern, keys))
}

/// Handler for GET /stats
///
/// Cache tiers, rate limiter and device optimizer in one snapshot.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.stats().await;
    let devices = state.devices.stats().await;
    Json(StatsResponse::new(cache, state.limiter.len(), devices))
}

/// Handler for GET /ping
pub async fn ping_handler(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        reply: state.cache.ping().await,
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for POST /devices/query
///
/// Per-device failures are reported in the body; the request itself succeeds.
pub async fn device_query_handler(
    State(state): State<AppState>,
    Json(req): Json<DeviceQueryRequest>,
) -> Result<Json<DeviceQueryResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let results = state.devices.query_devices(&req.device_ids, &req.options).await;
    Ok(Json(DeviceQueryResponse::new(results)))
}
