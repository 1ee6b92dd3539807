//! Prediction client.
//!
//! [`PredictionClient`] ties the cache, rate limiter, retry policy and
//! transport together. Construct one with [`PredictionClient::builder()`].

mod builder;
mod prediction;
mod stats;

pub use builder::{DEFAULT_RATE_LIMIT_INTERVAL, PredictionClientBuilder};
pub use prediction::PredictionClient;
pub use stats::RequestStats;
