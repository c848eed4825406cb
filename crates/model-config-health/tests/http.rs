use model_config_core::health::{HealthCheckClient, HealthClientError};
use model_config_core::{ConfigSource, HealthEndpoints, ModelCategory, Reconciler};
use model_config_crypto::{Algorithm, Cipher, SecretKey};
use model_config_health::HttpHealthCheckClient;
use model_config_storage::{KeyValueStore, MemoryStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_posts_json_and_returns_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/health/llm"))
        .and(body_partial_json(json!({"category": "llm"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpHealthCheckClient::new();
    let status = client
        .post(
            &format!("{}/api/v1/health/llm", server.uri()),
            &json!({"category": "llm", "models": []}),
        )
        .await
        .unwrap();
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_error_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model offline"))
        .mount(&server)
        .await;

    let status = HttpHealthCheckClient::new()
        .post(&format!("{}/api/v1/health/embedding", server.uri()), &json!({}))
        .await
        .unwrap();
    assert_eq!(status, 503);
}

#[tokio::test]
async fn test_slow_endpoint_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let err = HttpHealthCheckClient::new()
        .with_timeout(Duration::from_millis(50))
        .post(&format!("{}/api/v1/health/llm", server.uri()), &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, HealthClientError::Network(_)));
}

#[tokio::test]
async fn test_invalid_uri() {
    let err = HttpHealthCheckClient::new()
        .post("not a uri", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, HealthClientError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_reconciler_against_live_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/health/llm"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/health/embedding"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let algorithm = Algorithm::Aes256Gcm;
    let cipher = Cipher::new(algorithm, SecretKey::generate(algorithm).unwrap()).unwrap();
    let reconciler = Reconciler::builder(
        store.clone(),
        Arc::new(cipher),
        Arc::new(HttpHealthCheckClient::new()),
    )
    .endpoints(HealthEndpoints::new(server.uri()))
    .build();

    let source = ConfigSource::inline(
        json!({
            "llm": [{"provider": "openAI", "configuration": {"model": "gpt-4o"}}],
            "embedding": [{"provider": "openAI", "configuration": {"model": "text-embedding-3-small"}}]
        })
        .to_string(),
    );

    let err = reconciler.reconcile(&source).await.unwrap_err();
    assert_eq!(err.category(), Some(ModelCategory::Embedding));
    assert!(store.is_empty());
    assert_eq!(store.get(model_config_core::DEFAULT_STORE_KEY).await.unwrap(), None);
}
