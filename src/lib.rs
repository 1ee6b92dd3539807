//! Genoscore - resilient caching client for variant effect prediction
//!
//! This crate turns a stream of variant-scoring requests into rate-limited,
//! retried, cached calls against a remote prediction service. Results are
//! kept in a bounded on-disk cache so re-scoring the same variants costs no
//! network traffic.
//!
//! # Example
//!
//! ```rust,no_run
//! use genoscore::{PredictionClient, Variant};
//!
//! #[tokio::main]
//! async fn main() -> genoscore::Result<()> {
//!     let client = PredictionClient::builder()
//!         .api_key("your-api-key")
//!         .cache_dir("/tmp/genoscore-cache")
//!         .build()?;
//!
//!     let variant = Variant::new("chr1", 12_345, "A", "G", "ACGTACGTAGGCTA");
//!     let scores = client
//!         .predict_variant(&variant, &["pathogenicity", "expression_change"])
//!         .await?;
//!
//!     for (kind, score) in &scores {
//!         println!("{kind}: {score:.3}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Batches
//!
//! [`PredictionClient::predict_batch`] keeps input order and turns failed
//! items into empty maps; [`PredictionClient::predict_batch_detailed`]
//! returns the error for each failed item instead.

pub mod cache;
pub mod client;
pub mod clock;
#[cfg(feature = "cli")]
pub mod config;
pub mod error;
pub mod providers;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheKey, CacheStats, CacheStore};
pub use client::{PredictionClient, PredictionClientBuilder, RequestStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, GenoscoreError, Result};
pub use providers::{
    HttpTransport, PredictionTransport, RateLimiter, RetryConfig, RetryPolicy,
};
pub use types::{PredictionRequest, PredictionResponse, Predictions, Variant};
pub use version::{PKG_VERSION, version_string};
