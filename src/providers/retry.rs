//! Retry configuration, delay calculation, and the retry loop.
//!
//! [`RetryPolicy::execute`] runs one network attempt at a time, classifying
//! each failure with [`GenoscoreError::is_transient()`]. Permanent errors
//! are returned immediately; transient ones are retried with exponential
//! backoff, honouring `retry_after` hints from rate-limit responses.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::telemetry;
use crate::{GenoscoreError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// ```rust
/// # use genoscore::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_retries(5)
///     .base_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Additional attempts after the first. 0 = no retry. Default: 3.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    /// Default: 1s.
    pub base_delay: Duration,
    /// Maximum backoff delay (caps exponential growth). Default: 60s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Total attempts, including the initial request.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before retry `attempt` (0-indexed): `base_delay * 2^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting server `retry_after` hints.
    ///
    /// A `retry_after` duration (from a `RateLimited` error) replaces the
    /// calculated backoff. Both are capped at `max_delay`.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.map_or_else(
            || self.delay_for_attempt(attempt),
            |hint| hint.min(self.max_delay),
        )
    }
}

/// A [`RetryConfig`] plus running counters.
///
/// Counters are shared by every caller of [`execute`](Self::execute) and
/// only ever increase.
#[derive(Debug, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
    retries: AtomicU64,
    rate_limit_events: AtomicU64,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            retries: AtomicU64::new(0),
            rate_limit_events: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Retries performed so far (sleeps, not counting first attempts).
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Rate-limit responses observed so far, retried or not.
    pub fn rate_limit_events(&self) -> u64 {
        self.rate_limit_events.load(Ordering::Relaxed)
    }

    /// Execute an async operation with retry logic.
    ///
    /// Makes at most `max_retries + 1` attempts. When every attempt fails
    /// transiently the result is [`GenoscoreError::RetriesExhausted`]
    /// carrying the last failure.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts();
        let mut attempt: u32 = 0;
        loop {
            let err = match f().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_transient() => return Err(e), // permanent error, no retry
                Err(e) => e,
            };

            let rate_limited = matches!(err, GenoscoreError::RateLimited { .. });
            if rate_limited {
                self.rate_limit_events.fetch_add(1, Ordering::Relaxed);
            }

            attempt += 1;
            if attempt >= max_attempts {
                warn!(
                    operation,
                    attempts = attempt,
                    error = %err,
                    "giving up after transient errors"
                );
                return Err(GenoscoreError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.config.effective_delay(attempt - 1, err.retry_after());
            let reason = if rate_limited { "rate_limited" } else { "transient" };
            self.retries.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::RETRIES_TOTAL,
                "operation" => operation.to_owned(),
                "reason" => reason,
            )
            .increment(1);
            warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                reason,
                error = %err,
                "retrying after transient error"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
