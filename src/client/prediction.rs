//! The caching, rate-limited, retrying prediction client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::builder::PredictionClientBuilder;
use super::stats::{RequestStats, StatsCounters};
use crate::cache::{CacheKey, CacheStats, CacheStore};
use crate::providers::{PredictionTransport, RateLimiter, RetryPolicy};
use crate::telemetry;
use crate::types::{PredictionRequest, PredictionResponse, Predictions, Variant, normalize_kinds};
use crate::{GenoscoreError, Result};

/// Client for the variant-effect prediction service.
///
/// Each lookup goes cache → rate limiter → transport (under the retry
/// policy) → cache. The client is `Send + Sync` and may be shared across
/// tasks behind an `Arc`; rate limiting and cache bookkeeping are
/// serialised internally.
pub struct PredictionClient {
    pub(super) transport: Arc<dyn PredictionTransport>,
    pub(super) cache: Option<CacheStore>,
    pub(super) limiter: RateLimiter,
    pub(super) retry: RetryPolicy,
    pub(super) request_timeout: Duration,
    pub(super) counters: StatsCounters,
}

impl std::fmt::Debug for PredictionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionClient")
            .field("transport", &self.transport.name())
            .field("cache", &self.cache)
            .field("limiter", &self.limiter)
            .field("retry", self.retry.config())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl PredictionClient {
    pub fn builder() -> PredictionClientBuilder {
        PredictionClientBuilder::new()
    }

    /// Scores for one variant, restricted to `kinds`.
    ///
    /// Served from the cache when possible. Errors are counted in
    /// [`RequestStats::errors`] and returned; whether to skip the variant
    /// or abort is the caller's decision (see [`GenoscoreError::kind`]).
    pub async fn predict_variant<S: AsRef<str>>(
        &self,
        variant: &Variant,
        kinds: &[S],
    ) -> Result<Predictions> {
        let result = self.lookup(variant, kinds).await;
        if let Err(e) = &result {
            bump(&self.counters.errors);
            error!(variant = %variant.label(), kind = ?e.kind(), error = %e, "prediction failed");
        }
        result
    }

    /// Score many variants, preserving input order.
    ///
    /// A failed item becomes an empty map; use
    /// [`predict_batch_detailed`](Self::predict_batch_detailed) to see why.
    /// Only a zero `batch_size` fails the call as a whole.
    pub async fn predict_batch<S: AsRef<str>>(
        &self,
        variants: &[Variant],
        kinds: &[S],
        batch_size: usize,
    ) -> Result<Vec<Predictions>> {
        let results = self.predict_batch_detailed(variants, kinds, batch_size).await?;
        Ok(results
            .into_iter()
            .map(|r| r.unwrap_or_default())
            .collect())
    }

    /// Score many variants, returning one `Result` per input in order.
    ///
    /// Variants are processed sequentially; progress is logged after every
    /// `batch_size` items.
    pub async fn predict_batch_detailed<S: AsRef<str>>(
        &self,
        variants: &[Variant],
        kinds: &[S],
        batch_size: usize,
    ) -> Result<Vec<Result<Predictions>>> {
        if batch_size == 0 {
            return Err(GenoscoreError::Validation(
                "batch size must be at least 1".into(),
            ));
        }

        let total = variants.len();
        info!(total, batch_size, "processing variants in batches");

        let mut results = Vec::with_capacity(total);
        for chunk in variants.chunks(batch_size) {
            for variant in chunk {
                results.push(self.predict_variant(variant, kinds).await);
            }
            let processed = results.len();
            info!(
                processed,
                total,
                progress_pct = processed as f64 / total as f64 * 100.0,
                "batch progress"
            );
        }
        Ok(results)
    }

    pub fn stats(&self) -> RequestStats {
        self.counters.snapshot(&self.retry)
    }

    /// Cache statistics, or `None` when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(CacheStore::stats)
    }

    /// The underlying cache, if enabled.
    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    /// Remove every cached prediction. A no-op without a cache.
    pub fn clear_cache(&self) -> Result<()> {
        match &self.cache {
            Some(cache) => cache.clear(),
            None => Ok(()),
        }
    }

    async fn lookup<S: AsRef<str>>(&self, variant: &Variant, kinds: &[S]) -> Result<Predictions> {
        variant.validate()?;
        let kinds = normalize_kinds(kinds)?;
        let key = CacheKey::from_normalized(variant, &kinds);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get::<Predictions>(&key) {
                bump(&self.counters.cache_hits);
                debug!(variant = %variant.label(), "cache hit");
                return Ok(hit);
            }
        }
        bump(&self.counters.cache_misses);

        let request = PredictionRequest::single(variant, &kinds);
        let response = self
            .retry
            .execute("predict", || self.attempt(&request))
            .await?;
        let predictions = response.first_filtered(&kinds).ok_or_else(|| {
            GenoscoreError::UnexpectedResponse("response contains no variant".into())
        })?;
        bump(&self.counters.api_calls);

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &predictions) {
                warn!(variant = %variant.label(), error = %e, "failed to cache prediction");
            }
        }
        Ok(predictions)
    }

    /// One paced, time-bounded network attempt.
    async fn attempt(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        self.limiter.wait().await;

        let transport = self.transport.name().to_owned();
        let start = Instant::now();
        let call = self.transport.predict(request);
        let result = match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GenoscoreError::Timeout(self.request_timeout)),
        };

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "transport" => transport.clone(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "transport" => transport,
        )
        .record(start.elapsed().as_secs_f64());

        result
    }
}
