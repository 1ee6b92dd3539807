//! Transport seam between the client and the prediction service.
//!
//! [`PredictionClient`](crate::PredictionClient) never talks HTTP directly:
//! it hands a [`PredictionRequest`] to a [`PredictionTransport`]. The
//! production implementation is [`HttpTransport`](super::HttpTransport);
//! tests substitute in-memory fakes.
//!
//! # Error contract
//!
//! Implementations report one attempt's outcome. Failures must be
//! classified so that [`GenoscoreError::is_transient()`](crate::GenoscoreError::is_transient)
//! gives the right answer: `Http`/`Timeout`/`RateLimited`/5xx `Api` for
//! failures worth retrying, anything else for permanent ones. Retrying,
//! pacing and timeouts are applied by the client around each call.

use async_trait::async_trait;

use crate::Result;
use crate::types::{PredictionRequest, PredictionResponse};

/// One network round-trip to the prediction service.
#[async_trait]
pub trait PredictionTransport: Send + Sync {
    /// Transport name for logs and metric labels (e.g. "http").
    fn name(&self) -> &str;

    /// Submit one single-variant request.
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse>;
}
