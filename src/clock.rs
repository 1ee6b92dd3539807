//! Wall-clock abstraction for cache timestamps.
//!
//! Cache entries persist creation and access times as Unix seconds, so TTL
//! checks need a clock that survives process restarts. [`SystemClock`] is
//! used by default; [`ManualClock`] lets tests step time explicitly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time as fractional Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// A clock that only moves when told to.
///
/// Millisecond resolution.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Start at the given Unix time.
    pub fn starting_at(secs: u64) -> Self {
        Self {
            millis: AtomicU64::new(secs.saturating_mul(1000)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.millis.load(Ordering::SeqCst) as f64 / 1000.0
    }
}
