//! Integration Tests for the rate limiter
//!
//! Real-time windows, the background sweep and concurrent callers.

use std::time::Duration;

use netmon_cache::tasks::spawn_rate_limit_sweep;
use netmon_cache::RateLimiter;

#[tokio::test]
async fn test_fixed_window_allows_limit_then_resets() {
    let limiter = RateLimiter::new();

    let decisions: Vec<_> = (0..4).map(|_| limiter.check_limit("x", 3, 1000)).collect();

    assert!(decisions[..3].iter().all(|d| d.allowed));
    assert!(!decisions[3].allowed);
    assert_eq!(decisions[3].remaining, 0);
    assert_eq!(decisions[3].reset_time, decisions[0].reset_time);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let fifth = limiter.check_limit("x", 3, 1000);
    assert!(fifth.allowed);
    assert_eq!(fifth.remaining, 2);
    assert!(fifth.reset_time > decisions[0].reset_time);
}

#[tokio::test]
async fn test_reset_reopens_window_early() {
    let limiter = RateLimiter::new();
    limiter.check_limit("x", 1, 60_000);
    assert!(!limiter.check_limit("x", 1, 60_000).allowed);

    limiter.reset("x");

    assert!(limiter.check_limit("x", 1, 60_000).allowed);
}

#[tokio::test]
async fn test_sweep_bounds_tracked_keys() {
    let limiter = RateLimiter::new();
    for i in 0..50 {
        limiter.check_limit(&format!("client-{}", i), 10, 100);
    }
    limiter.check_limit("steady", 10, 60_000);
    assert_eq!(limiter.len(), 51);

    let handle = spawn_rate_limit_sweep(limiter.clone(), Duration::from_millis(150));
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle.abort();

    assert_eq!(limiter.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_never_exceed_limit() {
    let limiter = RateLimiter::new();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                (0..50)
                    .filter(|_| limiter.check_limit("shared", 100, 60_000).allowed)
                    .count()
            })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        allowed += handle.await.unwrap();
    }
    assert_eq!(allowed, 100);
}
