//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::optimizer::QueryOptions;

/// Longest key accepted over HTTP
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (tier default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        if self.ttl == Some(0) {
            return Some("TTL must be positive".to_string());
        }
        None
    }
}

/// Query string for GET /keys
#[derive(Debug, Clone, Deserialize)]
pub struct KeysQuery {
    /// Glob pattern; `*` and `?` are wildcards
    #[serde(default = "match_all")]
    pub pattern: String,
}

fn match_all() -> String {
    "*".to_string()
}

/// Request body for POST /devices/query
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQueryRequest {
    pub device_ids: Vec<String>,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl DeviceQueryRequest {
    pub fn validate(&self) -> Option<String> {
        if self.device_ids.is_empty() {
            return Some("deviceIds cannot be empty".to_string());
        }
        if self.device_ids.iter().any(|id| id.trim().is_empty()) {
            return Some("deviceIds cannot contain empty ids".to_string());
        }
        None
    }
}
