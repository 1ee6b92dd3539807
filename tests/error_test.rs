//! Error classification and display.

use std::error::Error as _;
use std::path::PathBuf;
use std::time::Duration;

use genoscore::{ErrorKind, GenoscoreError};

fn api(status: u16) -> GenoscoreError {
    GenoscoreError::Api {
        status,
        message: "x".into(),
    }
}

#[test]
fn transient_classification() {
    assert!(GenoscoreError::Http("reset".into()).is_transient());
    assert!(GenoscoreError::Timeout(Duration::from_secs(30)).is_transient());
    assert!(GenoscoreError::RateLimited { retry_after: None }.is_transient());
    assert!(api(500).is_transient());
    assert!(api(503).is_transient());

    assert!(!api(404).is_transient());
    assert!(!GenoscoreError::AuthenticationFailed.is_transient());
    assert!(!GenoscoreError::BadRequest("bad".into()).is_transient());
    assert!(!GenoscoreError::Validation("bad".into()).is_transient());
    assert!(!GenoscoreError::UnexpectedResponse("bad".into()).is_transient());
}

#[test]
fn exhausted_retries_are_terminal() {
    let err = GenoscoreError::RetriesExhausted {
        attempts: 4,
        last: Box::new(api(502)),
    };
    assert!(!err.is_transient());
    assert_eq!(err.kind(), ErrorKind::TransientService);
}

#[test]
fn kind_mapping() {
    assert_eq!(GenoscoreError::Validation("v".into()).kind(), ErrorKind::Validation);
    assert_eq!(
        GenoscoreError::RateLimited { retry_after: None }.kind(),
        ErrorKind::RateLimitExceeded
    );
    assert_eq!(api(500).kind(), ErrorKind::TransientService);
    assert_eq!(api(418).kind(), ErrorKind::PermanentService);
    assert_eq!(GenoscoreError::AuthenticationFailed.kind(), ErrorKind::PermanentService);
    assert_eq!(GenoscoreError::BadRequest("b".into()).kind(), ErrorKind::PermanentService);
    assert_eq!(
        GenoscoreError::CacheCorruption {
            path: PathBuf::from("/tmp/x.json"),
            reason: "eof".into(),
        }
        .kind(),
        ErrorKind::CacheCorruption
    );
    assert_eq!(GenoscoreError::Configuration("c".into()).kind(), ErrorKind::Local);
    let io = std::io::Error::other("disk");
    assert_eq!(GenoscoreError::from(io).kind(), ErrorKind::Local);
}

#[test]
fn rate_limit_exhaustion_kind() {
    let err = GenoscoreError::RetriesExhausted {
        attempts: 4,
        last: Box::new(GenoscoreError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        }),
    };
    assert!(err.is_rate_limit());
    assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
}

#[test]
fn retry_after_only_on_rate_limits() {
    let hint = Duration::from_secs(9);
    assert_eq!(
        GenoscoreError::RateLimited {
            retry_after: Some(hint)
        }
        .retry_after(),
        Some(hint)
    );
    assert_eq!(api(503).retry_after(), None);
}

#[test]
fn exhaustion_exposes_source() {
    let err = GenoscoreError::RetriesExhausted {
        attempts: 2,
        last: Box::new(GenoscoreError::Http("reset".into())),
    };
    let source = err.source().expect("has source");
    assert_eq!(source.to_string(), "HTTP error: reset");
    assert!(err.to_string().contains("gave up after 2 attempts"));
}

#[test]
fn display_messages() {
    assert_eq!(
        GenoscoreError::Validation("chromosome is empty".into()).to_string(),
        "invalid input: chromosome is empty"
    );
    assert_eq!(api(404).to_string(), "API error (404): x");
    assert_eq!(
        GenoscoreError::AuthenticationFailed.to_string(),
        "authentication failed"
    );
}
