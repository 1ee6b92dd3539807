//! Telemetry metric name constants.
//!
//! Centralised metric names for genoscore operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `genoscore_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `transport`: transport name (e.g. "http")
//! - `status`: outcome: "ok" or "error"
//! - `reason`: retry cause: "rate_limited" or "transient"

/// Total prediction requests sent to the service (one per attempt).
///
/// Labels: `transport`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "genoscore_requests_total";

/// Per-attempt request duration in seconds.
///
/// Labels: `transport`.
pub const REQUEST_DURATION_SECONDS: &str = "genoscore_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `operation`, `reason` ("rate_limited" | "transient").
pub const RETRIES_TOTAL: &str = "genoscore_retries_total";

/// Total cache hits.
pub const CACHE_HITS_TOTAL: &str = "genoscore_cache_hits_total";

/// Total cache misses (unknown, expired, or unreadable entries).
pub const CACHE_MISSES_TOTAL: &str = "genoscore_cache_misses_total";

/// Entries removed to honour the cache size bound.
pub const CACHE_EVICTIONS_TOTAL: &str = "genoscore_cache_evictions_total";

/// Entries removed because their TTL elapsed.
pub const CACHE_EXPIRATIONS_TOTAL: &str = "genoscore_cache_expirations_total";

/// Time spent blocked in the rate limiter, in seconds.
pub const RATE_LIMIT_WAIT_SECONDS: &str = "genoscore_rate_limit_wait_seconds";
