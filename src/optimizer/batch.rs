//! Adaptive Batch Manager
//!
//! Tunes the device batch size from measured throughput. The last 10 samples
//! are kept; on each adjustment the mean of the 3 newest is compared with the
//! mean of the whole window.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CacheError, Result};

/// Bounds and step for batch-size tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTuning {
    pub initial_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub step: usize,
    /// Samples kept in the rolling window
    pub window: usize,
    /// Newest samples compared against the window
    pub recent: usize,
    /// Relative change needed to move, e.g. 0.1 for 10%
    pub threshold: f64,
    pub adjust_interval_ms: u64,
}

impl Default for BatchTuning {
    fn default() -> Self {
        Self {
            initial_size: 20,
            min_size: 10,
            max_size: 100,
            step: 5,
            window: 10,
            recent: 3,
            threshold: 0.1,
            adjust_interval_ms: 5_000,
        }
    }
}

impl BatchTuning {
    pub fn validate(&self) -> Result<()> {
        if self.initial_size == 0 || self.min_size == 0 || self.min_size > self.max_size {
            return Err(CacheError::InvalidConfig(format!(
                "batch sizes must satisfy 0 < min ({}) <= max ({}) and initial > 0",
                self.min_size, self.max_size
            )));
        }
        if self.recent == 0 || self.recent > self.window {
            return Err(CacheError::InvalidConfig(
                "recent sample count must be within the window".into(),
            ));
        }
        if self.adjust_interval_ms == 0 {
            return Err(CacheError::InvalidConfig(
                "adjust_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one tuning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchAdjustment {
    Grew(usize),
    Shrank(usize),
    Held(usize),
}

// == Adaptive Batch Manager ==
#[derive(Debug)]
pub struct AdaptiveBatchManager {
    batch_size: usize,
    samples: VecDeque<f64>,
    tuning: BatchTuning,
}

impl AdaptiveBatchManager {
    pub fn new(tuning: BatchTuning) -> Self {
        Self {
            batch_size: tuning.initial_size,
            samples: VecDeque::with_capacity(tuning.window),
            tuning,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn tuning(&self) -> &BatchTuning {
        &self.tuning
    }

    /// Records the throughput (items per second) of one processed batch.
    pub fn record(&mut self, items: usize, elapsed: Duration) {
        let secs = elapsed.as_secs_f64().max(1e-6);
        if self.samples.len() == self.tuning.window {
            self.samples.pop_front();
        }
        self.samples.push_back(items as f64 / secs);
    }

    pub fn samples(&self) -> usize {
        self.samples.len()
    }

    /// Grows or shrinks the batch size by one step when the newest samples
    /// beat or trail the window mean by more than the threshold.
    pub fn adjust(&mut self) -> BatchAdjustment {
        if self.samples.len() < self.tuning.recent {
            return BatchAdjustment::Held(self.batch_size);
        }

        let overall = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        let recent = self
            .samples
            .iter()
            .rev()
            .take(self.tuning.recent)
            .sum::<f64>()
            / self.tuning.recent as f64;

        let previous = self.batch_size;
        let outcome = if recent > overall * (1.0 + self.tuning.threshold) {
            self.batch_size = (self.batch_size + self.tuning.step).min(self.tuning.max_size);
            BatchAdjustment::Grew(self.batch_size)
        } else if recent < overall * (1.0 - self.tuning.threshold) {
            self.batch_size = self
                .batch_size
                .saturating_sub(self.tuning.step)
                .max(self.tuning.min_size);
            BatchAdjustment::Shrank(self.batch_size)
        } else {
            BatchAdjustment::Held(self.batch_size)
        };

        if self.batch_size != previous {
            info!(
                from = previous,
                to = self.batch_size,
                recent_throughput = recent,
                window_throughput = overall,
                "Batch size adjusted"
            );
        }
        outcome
    }
}
