//! Device Connector Module
//!
//! The seam between the optimizer and whatever actually talks to network
//! devices. `SimulatedConnector` answers from memory with a fixed latency.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::optimizer::pool::DeviceConnection;

/// What to ask a device for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// SNMP-style object identifiers to read
    #[serde(default)]
    pub oids: Vec<String>,
    /// Consult and fill the query cache
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    /// Per-device deadline
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_use_cache() -> bool {
    true
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            oids: Vec::new(),
            use_cache: true,
            timeout_ms: None,
        }
    }
}

impl QueryOptions {
    pub fn with_oids<I, S>(oids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            oids: oids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Query cache key for one device.
    pub fn cache_key(&self, device_id: &str) -> String {
        format!("device:{}:{}", device_id, self.oids.join(","))
    }
}

/// Outcome of querying one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceQueryResult {
    pub device_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub from_cache: bool,
    /// Milliseconds
    pub response_time_ms: f64,
}

impl DeviceQueryResult {
    pub fn ok(device_id: &str, data: Value, from_cache: bool, response_time_ms: f64) -> Self {
        Self {
            device_id: device_id.to_string(),
            success: true,
            data: Some(data),
            error: None,
            from_cache,
            response_time_ms,
        }
    }

    pub fn failed(device_id: &str, error: impl Into<String>, response_time_ms: f64) -> Self {
        Self {
            device_id: device_id.to_string(),
            success: false,
            data: None,
            error: Some(error.into()),
            from_cache: false,
            response_time_ms,
        }
    }
}

// == Connector Trait ==
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Opens a connection to a device.
    async fn connect(&self, device_id: &str) -> anyhow::Result<DeviceConnection>;

    /// Reads the requested data over an open connection.
    async fn query(&self, conn: &DeviceConnection, options: &QueryOptions) -> anyhow::Result<Value>;
}

// == Simulated Connector ==
/// In-memory connector for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector {
    latency: Duration,
    unreachable: HashSet<String>,
}

impl SimulatedConnector {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            unreachable: HashSet::new(),
        }
    }

    /// Marks a device as refusing connections.
    pub fn with_unreachable(mut self, device_id: impl Into<String>) -> Self {
        self.unreachable.insert(device_id.into());
        self
    }
}

#[async_trait]
impl DeviceConnector for SimulatedConnector {
    async fn connect(&self, device_id: &str) -> anyhow::Result<DeviceConnection> {
        if self.unreachable.contains(device_id) {
            anyhow::bail!("device {} is unreachable", device_id);
        }
        Ok(DeviceConnection::new(device_id))
    }

    async fn query(&self, conn: &DeviceConnection, options: &QueryOptions) -> anyhow::Result<Value> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let values: Map<String, Value> = options
            .oids
            .iter()
            .map(|oid| (oid.clone(), json!(format!("{}@{}", oid, conn.device_id))))
            .collect();

        Ok(json!({
            "deviceId": conn.device_id,
            "connectionId": conn.id,
            "values": values,
            "polledAt": chrono::Utc::now().to_rfc3339(),
        }))
    }
}
