mod common;

use common::init_tracing;
use devotional_service::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use devotional_service::services::providers::{GenerationParams, ProviderError, TextProvider};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

fn provider(server: &MockServer) -> GeminiTextProvider {
    GeminiTextProvider::new(GeminiConfig {
        api_url: format!("{}{}", server.uri(), GENERATE_PATH),
        api_key: Arc::new(SecretString::new("test-api-key".to_string())),
        timeout: Duration::from_secs(5),
    })
    .expect("provider should build")
}

#[tokio::test]
async fn sends_prompt_and_sampling_and_returns_first_candidate() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_json(json!({
            "contents": [{"parts": [{"text": "Selecione uma passagem"}]}],
            "generationConfig": {"temperature": 0.5, "topP": 0.25}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"verse_reference\": \"Tiago 1:5\"}"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = GenerationParams {
        temperature: 0.5,
        top_p: 0.25,
    };
    let text = provider(&server)
        .generate("Selecione uma passagem", &params)
        .await
        .unwrap();

    assert_eq!(text, "{\"verse_reference\": \"Tiago 1:5\"}");
}

#[tokio::test]
async fn non_success_status_keeps_the_body() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("The model is overloaded."))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("prompt", &GenerationParams::PASSAGE)
        .await
        .unwrap_err();

    match &err {
        ProviderError::Status { status, body } => {
            assert_eq!(*status, 503);
            assert_eq!(body, "The model is overloaded.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn success_without_candidate_text_is_an_invalid_envelope() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate("prompt", &GenerationParams::DEVOTIONAL)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::InvalidEnvelope { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    init_tracing();
    let server = MockServer::start().await;
    let provider = provider(&server);
    drop(server);

    let err = provider
        .generate("prompt", &GenerationParams::PASSAGE)
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Network(_)));
    assert!(err.is_transient());
}

#[test]
fn empty_api_key_is_rejected() {
    let result = GeminiTextProvider::new(GeminiConfig {
        api_url: "http://localhost".to_string(),
        api_key: Arc::new(SecretString::new(String::new())),
        timeout: Duration::from_secs(5),
    });
    assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
}
