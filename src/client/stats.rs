//! Running request statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::providers::RetryPolicy;

/// Snapshot of a client's counters.
///
/// All counters increase monotonically for the lifetime of the client and
/// are not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStats {
    /// Predictions served by the network.
    pub api_calls: u64,
    /// Predictions served from the cache.
    pub cache_hits: u64,
    /// Predictions not served from the cache (includes every request when
    /// caching is disabled).
    pub cache_misses: u64,
    /// `predict_variant` calls that returned an error.
    pub errors: u64,
    /// Rate-limit responses received, whether or not a retry followed.
    pub rate_limit_events: u64,
    /// Retry attempts made (not counting first attempts).
    pub retries: u64,
}

impl RequestStats {
    /// Percentage of lookups served from the cache (0–100).
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64 * 100.0
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub api_calls: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub errors: AtomicU64,
}

impl StatsCounters {
    pub fn snapshot(&self, retry: &RetryPolicy) -> RequestStats {
        RequestStats {
            api_calls: self.api_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            rate_limit_events: retry.rate_limit_events(),
            retries: retry.retries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_of_nothing_is_zero() {
        assert_eq!(RequestStats::default().cache_hit_rate(), 0.0);
    }

    #[test]
    fn hit_rate_is_a_percentage() {
        let stats = RequestStats {
            cache_hits: 1,
            cache_misses: 3,
            ..Default::default()
        };
        assert_eq!(stats.cache_hit_rate(), 25.0);
    }
}
