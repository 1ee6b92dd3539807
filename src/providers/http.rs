//! HTTP transport for the variant-effect prediction service.
//!
//! Sends `POST {base_url}/predict` with a bearer token and maps HTTP status
//! codes onto [`GenoscoreError`] variants so the retry loop can tell
//! transient failures from permanent ones.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use super::traits::PredictionTransport;
use crate::types::{PredictionRequest, PredictionResponse};
use crate::version::user_agent;
use crate::{GenoscoreError, Result};

/// Default base URL of the prediction service.
pub const DEFAULT_BASE_URL: &str = "https://api.alphagenome.deepmind.com/v1";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed [`PredictionTransport`].
#[derive(Clone)]
pub struct HttpTransport {
    api_key: String,
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Transport against the public service endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Transport with a custom base URL (for testing with wiremock).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GenoscoreError::Validation("API key is empty".into()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| GenoscoreError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenoscoreError {
        if e.is_timeout() {
            GenoscoreError::Timeout(self.timeout)
        } else {
            GenoscoreError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl PredictionTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let url = format!("{}/predict", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let response = handle_response_errors(response).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(e))?;
        serde_json::from_slice(&body).map_err(|e| {
            GenoscoreError::UnexpectedResponse(format!("invalid prediction response: {e}"))
        })
    }
}

/// Error body shape used by the service for 400 responses.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

async fn handle_response_errors(response: Response) -> Result<Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(GenoscoreError::RateLimited { retry_after })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(GenoscoreError::AuthenticationFailed)
        }
        StatusCode::BAD_REQUEST => {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| "unknown error".to_string());
            Err(GenoscoreError::BadRequest(message))
        }
        code => {
            let text = response.text().await.unwrap_or_default();
            let message = if text.is_empty() {
                code.canonical_reason().unwrap_or("unknown status").to_string()
            } else {
                text
            };
            Err(GenoscoreError::Api {
                status: code.as_u16(),
                message,
            })
        }
    }
}
