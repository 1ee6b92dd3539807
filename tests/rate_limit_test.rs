//! RateLimiter spacing tests, run on tokio's paused clock.

use std::sync::Arc;
use std::time::Duration;

use genoscore::RateLimiter;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn consecutive_waits_are_spaced() {
    let limiter = RateLimiter::new(Duration::from_millis(100));

    limiter.wait().await;
    let after_first = Instant::now();
    limiter.wait().await;

    assert!(after_first.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn idle_time_counts_toward_interval() {
    let limiter = RateLimiter::new(Duration::from_millis(100));

    limiter.wait().await;
    tokio::time::sleep(Duration::from_millis(250)).await;
    let before = Instant::now();
    limiter.wait().await;

    assert_eq!(before.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn no_burst_credit_after_idle() {
    let limiter = RateLimiter::new(Duration::from_millis(100));

    limiter.wait().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    limiter.wait().await;
    let before = Instant::now();
    limiter.wait().await;

    assert!(before.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_are_serialised() {
    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(50)));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move {
            limiter.wait().await;
            Instant::now()
        }));
    }

    let mut times = Vec::new();
    for handle in handles {
        times.push(handle.await.unwrap());
    }
    times.sort();

    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(50));
    }
}
