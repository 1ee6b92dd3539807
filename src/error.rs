//! Genoscore error types

use std::path::PathBuf;
use std::time::Duration;

/// Genoscore error types
#[derive(Debug, thiserror::Error)]
pub enum GenoscoreError {
    // Caller errors
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    // Service/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A transient failure persisted through every allowed attempt.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GenoscoreError>,
    },

    // Local cache errors, recovered inside the cache layer
    #[error("corrupt cache entry {}: {reason}", path.display())]
    CacheCorruption { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of a [`GenoscoreError`], for callers that decide
/// between skipping a variant, backing off, or aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or missing parameters. Never retried.
    Validation,
    /// The service kept signalling rate limits until retries ran out.
    RateLimitExceeded,
    /// Network failure, timeout or 5xx; surfaced only after retries ran out.
    TransientService,
    /// 4xx other than rate limiting, or an unusable response body.
    PermanentService,
    /// Unreadable cache payload (normally handled inside the cache).
    CacheCorruption,
    /// Local I/O or configuration problem.
    Local,
}

impl GenoscoreError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Transport failures, timeouts, rate limits and 5xx responses are
    /// transient. Everything else (including [`RetriesExhausted`](Self::RetriesExhausted),
    /// which is terminal by construction) is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-communicated wait hint, if this is a rate-limit response.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether this error is, or was ultimately caused by, a rate-limit signal.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::RetriesExhausted { last, .. } => last.is_rate_limit(),
            _ => false,
        }
    }

    /// Map this error onto the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::RetriesExhausted { last, .. } if last.is_rate_limit() => {
                ErrorKind::RateLimitExceeded
            }
            Self::RetriesExhausted { .. } => ErrorKind::TransientService,
            Self::RateLimited { .. } => ErrorKind::RateLimitExceeded,
            e if e.is_transient() => ErrorKind::TransientService,
            Self::Api { .. }
            | Self::AuthenticationFailed
            | Self::BadRequest(_)
            | Self::UnexpectedResponse(_) => ErrorKind::PermanentService,
            Self::CacheCorruption { .. } => ErrorKind::CacheCorruption,
            _ => ErrorKind::Local,
        }
    }
}

/// Result type alias for Genoscore operations
pub type Result<T> = std::result::Result<T, GenoscoreError>;
