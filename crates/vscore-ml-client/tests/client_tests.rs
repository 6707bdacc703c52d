//! Vision and embedding clients against a mock backend.

use std::time::Duration;

use serde_json::json;
use vscore_ml_client::{
    AzureEmbeddingClient, AzureVisionClient, Embedder, EmbeddingConfig, ImagePayload, MlError,
    VisionConfig, VisionModel, VisionRequest,
};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn vision_config(endpoint: &str) -> VisionConfig {
    VisionConfig {
        endpoint: endpoint.to_string(),
        api_key: "test-key".to_string(),
        deployment: "gpt-5.1-codex-mini".to_string(),
        api_version: "2024-05-01-preview".to_string(),
        timeout: Duration::from_secs(5),
    }
}

fn embedding_config(endpoint: &str, dimensions: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        endpoint: endpoint.to_string(),
        api_key: "test-key".to_string(),
        deployment: "text-embedding-3-small".to_string(),
        api_version: "2024-05-01-preview".to_string(),
        dimensions,
        timeout: Duration::from_secs(5),
    }
}

fn request() -> VisionRequest {
    VisionRequest {
        system: "Respond with JSON".to_string(),
        user: "Analyze the video".to_string(),
        images: vec![ImagePayload::jpeg(vec![1, 2, 3])],
    }
}

#[tokio::test]
async fn completion_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-5.1-codex-mini/chat/completions"))
        .and(query_param("api-version", "2024-05-01-preview"))
        .and(header("api-key", "test-key"))
        .and(body_partial_json(json!({"response_format": {"type": "json_object"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"overallScore\": 82}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AzureVisionClient::new(vision_config(&server.uri())).unwrap();
    let text = client.complete(&request()).await.unwrap();
    assert_eq!(text, "{\"overallScore\": 82}");
}

#[tokio::test]
async fn server_error_is_retryable_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let client = AzureVisionClient::new(vision_config(&server.uri())).unwrap();
    let err = client.complete(&request()).await.unwrap_err();

    match &err {
        MlError::Status { status, body } => {
            assert_eq!(*status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn bad_request_is_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad image"))
        .mount(&server)
        .await;

    let client = AzureVisionClient::new(vision_config(&server.uri())).unwrap();
    let err = client.complete(&request()).await.unwrap_err();
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn empty_completion_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "   "}}]
        })))
        .mount(&server)
        .await;

    let client = AzureVisionClient::new(vision_config(&server.uri())).unwrap();
    assert!(matches!(
        client.complete(&request()).await,
        Err(MlError::EmptyCompletion)
    ));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = AzureVisionClient::new(vision_config(&server.uri())).unwrap();
    assert!(matches!(
        client.complete(&request()).await,
        Err(MlError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn missing_credentials_fail_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = vision_config(&server.uri());
    config.api_key = String::new();
    assert!(matches!(
        AzureVisionClient::new(config),
        Err(MlError::Config(_))
    ));
}

#[tokio::test]
async fn embedding_returns_first_vector() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/text-embedding-3-small/embeddings"))
        .and(body_partial_json(json!({"input": ["pacing tips"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.25, -0.5, 1.0]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AzureEmbeddingClient::new(embedding_config(&server.uri(), 3)).unwrap();
    let embedding = client.embed("pacing tips").await.unwrap();
    assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
    assert_eq!(client.dimensions(), 3);
}

#[tokio::test]
async fn embedding_width_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.1, 0.2]}]
        })))
        .mount(&server)
        .await;

    let client = AzureEmbeddingClient::new(embedding_config(&server.uri(), 1536)).unwrap();
    assert!(matches!(
        client.embed("hooks").await,
        Err(MlError::InvalidResponse(_))
    ));
}
