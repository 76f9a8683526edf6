//! Rate-Limit Sweep Task
//!
//! Background task that drops elapsed fixed windows so idle keys do not
//! accumulate.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::ratelimit::RateLimiter;

/// Spawns a task that sweeps elapsed rate-limit windows every `interval`.
pub fn spawn_rate_limit_sweep(limiter: RateLimiter, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let removed = limiter.sweep_expired();
            if removed > 0 {
                debug!(removed, remaining = limiter.len(), "Rate-limit sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_removes_elapsed_windows() {
        let limiter = RateLimiter::new();
        limiter.check_limit("short", 10, 50);
        limiter.check_limit("long", 10, 60_000);

        let handle = spawn_rate_limit_sweep(limiter.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(limiter.len(), 1);
        handle.abort();
    }
}
