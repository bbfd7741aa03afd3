#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use devotional_service::config::BatchConfig;
use devotional_service::services::providers::mock::MockTextProvider;
use devotional_service::services::store::MemoryStore;
use devotional_service::startup::{router, AppState};
use secrecy::SecretString;
use serde_json::{json, Value};
use service_core::middleware::{SharedSecret, CRON_SECRET_HEADER};
use service_core::retry::RetryConfig;
use std::sync::{Arc, Once};
use std::time::Duration;

pub const TEST_SECRET: &str = "test-cron-secret";

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A fixed instant in the middle of a UTC day.
pub fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 14, 12, 0, 0).unwrap()
}

pub fn test_retry() -> RetryConfig {
    RetryConfig::new(3, Duration::from_millis(2000))
}

pub fn passage_json(reference: &str, text: &str) -> String {
    json!({
        "verse_reference": reference,
        "verse_text": text,
        "reading_time_estimate": 2
    })
    .to_string()
}

pub fn devotional_json(title: &str, reference: &str) -> String {
    json!({
        "title": title,
        "description": "Uma meditação curta",
        "verse_reference": reference,
        "verse_text": "1. O Senhor é a minha força\n2. e o meu cântico",
        "reflection": "Reflexão sobre o texto",
        "application": "Aplicação prática",
        "prayer": "Senhor, ensina-me a confiar",
        "reading_time_estimate": 5
    })
    .to_string()
}

pub fn fenced(json_text: &str) -> String {
    format!("```json\n{}\n```", json_text)
}

pub fn app_state(store: Arc<MemoryStore>, provider: Arc<MockTextProvider>) -> AppState {
    AppState::new(
        store,
        provider,
        SharedSecret::new(Arc::new(SecretString::new(TEST_SECRET.to_string()))),
        test_retry(),
        BatchConfig::default(),
    )
}

pub fn app(store: Arc<MemoryStore>, provider: Arc<MockTextProvider>) -> axum::Router {
    router(app_state(store, provider))
}

pub fn trigger(path: &str, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(path);
    if let Some(secret) = secret {
        builder = builder.header(CRON_SECRET_HEADER, secret);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
