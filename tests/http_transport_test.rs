//! Wiremock integration tests for HttpTransport and the client over HTTP.

use std::time::Duration;

use genoscore::providers::{HttpTransport, PredictionTransport};
use genoscore::{
    ErrorKind, GenoscoreError, PKG_VERSION, PredictionClient, PredictionRequest, RetryConfig,
    Variant,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn variant() -> Variant {
    Variant::new("chr1", 12_345, "A", "G", "ACGTAGGCTA")
}

fn request() -> PredictionRequest {
    PredictionRequest::single(&variant(), &["expression".to_string(), "splicing".to_string()])
}

fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::with_base_url("test_key", server.uri(), Duration::from_secs(5)).unwrap()
}

fn success_body() -> serde_json::Value {
    serde_json::json!({
        "variants": [{
            "predictions": {"expression": 0.5, "splicing": 0.125, "chromatin": 0.9}
        }]
    })
}

#[tokio::test]
async fn test_predict_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(header("Authorization", "Bearer test_key"))
        .and(header("User-Agent", format!("genoscore/{PKG_VERSION}").as_str()))
        .and(body_partial_json(serde_json::json!({
            "sequence": "ACGTAGGCTA",
            "variants": [{"chromosome": "chr1", "position": 12345, "reference": "A", "alternate": "G"}],
            "predictions": ["expression", "splicing"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport(&server).predict(&request()).await.unwrap();

    assert_eq!(response.variants.len(), 1);
    assert_eq!(response.variants[0].predictions["expression"], 0.5);
    assert_eq!(response.variants[0].predictions["splicing"], 0.125);
}

#[tokio::test]
async fn test_rate_limited_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = transport(&server).predict(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        GenoscoreError::RateLimited {
            retry_after: Some(d)
        } if d == Duration::from_secs(7)
    ));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unauthorized() {
    for status in [401u16, 403] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let err = transport(&server).predict(&request()).await.unwrap_err();
        assert!(matches!(err, GenoscoreError::AuthenticationFailed), "status {status}");
        assert!(!err.is_transient());
    }
}

#[tokio::test]
async fn test_bad_request_uses_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"error": "invalid allele"})),
        )
        .mount(&server)
        .await;

    let err = transport(&server).predict(&request()).await.unwrap_err();
    match err {
        GenoscoreError::BadRequest(msg) => assert_eq!(msg, "invalid allele"),
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_errors_are_permanent_and_server_errors_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let err = transport(&server).predict(&request()).await.unwrap_err();
    assert!(matches!(err, GenoscoreError::Api { status: 404, .. }));
    assert!(!err.is_transient());

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;
    let err = transport(&server).predict(&request()).await.unwrap_err();
    match &err {
        GenoscoreError::Api { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "overloaded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = transport(&server).predict(&request()).await.unwrap_err();
    assert!(matches!(err, GenoscoreError::UnexpectedResponse(_)));
    assert_eq!(err.kind(), ErrorKind::PermanentService);
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let transport =
        HttpTransport::with_base_url("test_key", server.uri(), Duration::from_millis(200)).unwrap();
    let err = transport.predict(&request()).await.unwrap_err();
    assert!(matches!(err, GenoscoreError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_server_is_transient() {
    let transport =
        HttpTransport::with_base_url("test_key", "http://127.0.0.1:9", Duration::from_secs(2))
            .unwrap();
    let err = transport.predict(&request()).await.unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
}

// ============================================================================
// Client over HTTP
// ============================================================================

fn http_client(server: &MockServer, cache_dir: &std::path::Path) -> PredictionClient {
    PredictionClient::builder()
        .api_key("test_key")
        .base_url(server.uri())
        .cache_dir(cache_dir)
        .rate_limit_interval(Duration::ZERO)
        .retry(RetryConfig::new().base_delay(Duration::from_millis(10)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_client_retries_server_errors_then_caches() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = http_client(&server, dir.path());
    let kinds = ["splicing", "expression"];

    let first = client.predict_variant(&variant(), &kinds).await.unwrap();
    let second = client.predict_variant(&variant(), &kinds).await.unwrap();

    // Only the requested kinds are kept.
    assert_eq!(first.len(), 2);
    assert!(!first.contains_key("chromatin"));
    assert_eq!(first, second);

    let stats = client.stats();
    assert_eq!(stats.retries, 2);
    assert_eq!(stats.api_calls, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test]
async fn test_client_does_not_retry_bad_credentials() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = http_client(&server, dir.path());
    let err = client
        .predict_variant(&variant(), &["expression"])
        .await
        .unwrap_err();

    assert!(matches!(err, GenoscoreError::AuthenticationFailed));
    assert_eq!(client.stats().errors, 1);
}
