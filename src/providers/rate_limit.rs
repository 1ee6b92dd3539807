//! Minimum-interval pacing for outbound requests.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;

/// Enforces a minimum spacing between successive calls.
///
/// There is one "last call" instant per limiter; concurrent callers queue on
/// an async mutex and are released one interval apart. This is strict
/// spacing, not a token bucket: idle time earns no burst credit.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// `wait()` completed. The first call returns immediately.
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                let pause = ready_at - now;
                debug!(wait_ms = pause.as_millis() as u64, "rate limiter pausing");
                metrics::histogram!(telemetry::RATE_LIMIT_WAIT_SECONDS).record(pause.as_secs_f64());
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
