//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheTier, TieredStats};
use crate::optimizer::{DeviceManagerStats, DeviceQueryResult};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
    /// Tier that answered, `"l1"` or `"l2"`
    pub tier: &'static str,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value, tier: CacheTier) -> Self {
        Self {
            key: key.into(),
            value,
            tier: match tier {
                CacheTier::L1 => "l1",
                CacheTier::L2 => "l2",
            },
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for GET /exists/:key
#[derive(Debug, Clone, Serialize)]
pub struct ExistsResponse {
    pub key: String,
    pub exists: bool,
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub pattern: String,
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(pattern: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            pattern: pattern.into(),
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub cache: TieredStats,
    /// L1 hits over L1 operations
    pub l1_hit_ratio: f64,
    /// Keys currently tracked by the rate limiter
    pub rate_limited_clients: usize,
    pub devices: DeviceManagerStats,
}

impl StatsResponse {
    pub fn new(cache: TieredStats, rate_limited_clients: usize, devices: DeviceManagerStats) -> Self {
        let ops = cache.l1.total_operations;
        let l1_hit_ratio = if ops > 0 {
            cache.l1.hits as f64 / ops as f64
        } else {
            0.0
        };
        Self {
            cache,
            l1_hit_ratio,
            rate_limited_clients,
            devices,
        }
    }
}

/// Response body for GET /ping
#[derive(Debug, Clone, Serialize)]
pub struct PingResponse {
    pub reply: &'static str,
}

/// Response body for POST /devices/query
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQueryResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub from_cache: usize,
    pub results: Vec<DeviceQueryResult>,
}

impl DeviceQueryResponse {
    pub fn new(results: Vec<DeviceQueryResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            from_cache: results.iter().filter(|r| r.from_cache).count(),
            results,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status string
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use serde_json::json;

    #[test]
    fn test_get_response_reports_tier() {
        let resp = GetResponse::new("k", json!({"a": 1}), CacheTier::L2);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["tier"], "l2");
        assert_eq!(json["value"]["a"], 1);
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_keys_response_counts() {
        let resp = KeysResponse::new("dev:*", vec!["dev:1".into(), "dev:2".into()]);
        assert_eq!(resp.count, 2);
    }

    #[test]
    fn test_device_query_response_tallies() {
        let resp = DeviceQueryResponse::new(vec![
            DeviceQueryResult::ok("a", json!({}), true, 0.1),
            DeviceQueryResult::ok("b", json!({}), false, 1.0),
            DeviceQueryResult::failed("c", "down", 2.0),
        ]);
        assert_eq!(resp.total, 3);
        assert_eq!(resp.succeeded, 2);
        assert_eq!(resp.failed, 1);
        assert_eq!(resp.from_cache, 1);
    }

    #[test]
    fn test_l1_hit_ratio() {
        let cache = TieredStats {
            l1: CacheStats {
                hits: 3,
                total_operations: 4,
                ..CacheStats::default()
            },
            l2: None,
        };
        let devices = DeviceManagerStats {
            total_queries: 0,
            failed_queries: 0,
            batch_size: 20,
            pool: Default::default(),
            query_cache: Default::default(),
        };
        let resp = StatsResponse::new(cache, 0, devices);
        assert!((resp.l1_hit_ratio - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Something went wrong"));
    }
}
