//! Builder for configuring prediction clients

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::PredictionClient;
use super::stats::StatsCounters;
use crate::cache::{CacheConfig, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::providers::{
    DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpTransport, PredictionTransport, RateLimiter,
    RetryConfig, RetryPolicy,
};
use crate::{GenoscoreError, Result};

/// Default minimum spacing between network calls.
pub const DEFAULT_RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(100);

/// Builder for [`PredictionClient`].
///
/// ```rust,no_run
/// # use genoscore::{PredictionClient, RetryConfig};
/// # fn main() -> genoscore::Result<()> {
/// let client = PredictionClient::builder()
///     .api_key("your-key")
///     .cache_dir("/tmp/genoscore-cache")
///     .retry(RetryConfig::new().max_retries(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct PredictionClientBuilder {
    api_key: Option<String>,
    base_url: String,
    cache_dir: Option<PathBuf>,
    cache_config: CacheConfig,
    rate_limit_interval: Duration,
    retry_config: RetryConfig,
    request_timeout: Duration,
    transport: Option<Arc<dyn PredictionTransport>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for PredictionClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionClientBuilder {
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: None,
            cache_config: CacheConfig::default(),
            rate_limit_interval: DEFAULT_RATE_LIMIT_INTERVAL,
            retry_config: RetryConfig::default(),
            request_timeout: DEFAULT_TIMEOUT,
            transport: None,
            clock: None,
        }
    }

    /// Bearer credential for the HTTP transport.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the service base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Enable the on-disk cache rooted at `dir`. Without this, every
    /// request goes to the network.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Minimum spacing between network calls. Default: 100ms.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Per-attempt timeout. Default: 30s.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Use a custom transport instead of HTTP. The API key and base URL
    /// are ignored when set.
    pub fn transport(mut self, transport: Arc<dyn PredictionTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Clock used for cache timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<PredictionClient> {
        if self.request_timeout.is_zero() {
            return Err(GenoscoreError::Validation(
                "request timeout must be greater than zero".into(),
            ));
        }
        self.cache_config.validate()?;

        let transport: Arc<dyn PredictionTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let key = self.api_key.ok_or_else(|| {
                    GenoscoreError::Validation("an API key is required".into())
                })?;
                Arc::new(HttpTransport::with_base_url(
                    key,
                    self.base_url,
                    self.request_timeout,
                )?)
            }
        };

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cache = match self.cache_dir {
            Some(dir) => Some(CacheStore::open_with_clock(dir, self.cache_config, clock)?),
            None => None,
        };

        Ok(PredictionClient {
            transport,
            cache,
            limiter: RateLimiter::new(self.rate_limit_interval),
            retry: RetryPolicy::new(self.retry_config),
            request_timeout: self.request_timeout,
            counters: StatsCounters::default(),
        })
    }
}
