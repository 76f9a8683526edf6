//! Prewarm Module
//!
//! Scheduled refresh of keys matching a pattern through a caller-supplied
//! loader. Keys are processed in sequential chunks of `batch_size`; loads
//! within a chunk run concurrently. A failing key is reported and skipped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{compile_pattern, CacheEvent, MemoryCacheManager};
use crate::error::{CacheError, Result};

// == Prewarm Config ==
/// Schedule for one prewarm pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrewarmConfig {
    /// Glob pattern selecting keys to refresh
    pub pattern: String,
    /// Milliseconds between refresh cycles
    pub refresh_interval_ms: u64,
    /// 1-10, informational
    pub priority: u8,
    /// Informational; chunks of `batch_size` bound the real concurrency
    pub max_concurrency: usize,
    /// Keys loaded concurrently per chunk
    pub batch_size: usize,
}

impl PrewarmConfig {
    pub fn validate(&self) -> Result<()> {
        compile_pattern(&self.pattern)?;
        if self.refresh_interval_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "refresh_interval_ms must be positive".into(),
            ));
        }
        if !(1..=10).contains(&self.priority) {
            return Err(CacheError::InvalidConfig(format!(
                "priority must be within 1-10, got {}",
                self.priority
            )));
        }
        if self.batch_size == 0 {
            return Err(CacheError::InvalidConfig("batch_size must be positive".into()));
        }
        Ok(())
    }
}

// == Loader ==
/// Produces a fresh value for a key; `Ok(None)` leaves the key untouched.
#[async_trait]
pub trait PrewarmLoader: Send + Sync {
    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>>;
}

#[async_trait]
impl<F, Fut> PrewarmLoader for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
{
    async fn load(&self, key: &str) -> anyhow::Result<Option<Value>> {
        (self)(key.to_string()).await
    }
}

impl MemoryCacheManager {
    /// Starts (or replaces) the prewarm schedule for `config.pattern`.
    ///
    /// The first cycle runs immediately, then every `refresh_interval_ms`.
    pub fn start_prewarm(
        &self,
        config: PrewarmConfig,
        loader: Arc<dyn PrewarmLoader>,
    ) -> Result<()> {
        config.validate()?;

        let weak = self.downgrade();
        let pattern = config.pattern.clone();
        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(config.refresh_interval_ms));
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                cache.run_prewarm_cycle(&config, loader.as_ref()).await;
            }
        });

        info!(pattern = %pattern, "Prewarm schedule started");
        self.tasks().replace_prewarm(&pattern, handle);
        Ok(())
    }

    /// Cancels the schedule for a pattern; false if none was running.
    pub fn stop_prewarm(&self, pattern: &str) -> bool {
        match self.tasks().take_prewarm(pattern) {
            Some(handle) => {
                handle.abort();
                info!(pattern, "Prewarm schedule stopped");
                true
            }
            None => false,
        }
    }

    /// Runs one refresh cycle and returns how many keys were rewritten.
    pub async fn run_prewarm_cycle(&self, config: &PrewarmConfig, loader: &dyn PrewarmLoader) -> usize {
        let keys = self.keys(&config.pattern).await;
        let mut refreshed = 0;

        for chunk in keys.chunks(config.batch_size) {
            let loads = chunk.iter().map(|key| async move { (key, loader.load(key).await) });

            for (key, outcome) in join_all(loads).await {
                match outcome {
                    Ok(Some(value)) => {
                        if self.set_value(key, value, None, None).await {
                            refreshed += 1;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let err = CacheError::Loader(e.to_string());
                        warn!(pattern = %config.pattern, key = %key, error = %err, "Prewarm load failed");
                        self.emit(CacheEvent::PrewarmError {
                            pattern: config.pattern.clone(),
                            key: key.clone(),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        debug!(pattern = %config.pattern, refreshed, "Prewarm cycle completed");
        self.emit(CacheEvent::PrewarmCompleted {
            pattern: config.pattern.clone(),
            refreshed,
        });
        refreshed
    }
}
