//! Network-facing building blocks used by the client.
//!
//! - [`PredictionTransport`]: one request/response round-trip.
//! - [`HttpTransport`]: the reqwest implementation.
//! - [`RetryPolicy`]: retry with exponential backoff over a transport call.
//! - [`RateLimiter`]: minimum spacing between calls.

pub mod http;
pub mod rate_limit;
pub mod retry;
pub mod traits;

pub use http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpTransport};
pub use rate_limit::RateLimiter;
pub use retry::{RetryConfig, RetryPolicy};
pub use traits::PredictionTransport;
