//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use axum::{Router, body::Body};

use study_tutor::api::AppState;
use study_tutor::api::app;
use study_tutor::core::AppConfig;
use study_tutor::core::db::memory_db;

pub const TEST_MODEL: &str = "gemini-test";

/// Matches the generate content endpoint of the test model. The
/// API key travels in the query string so the pattern isn't anchored
/// at the end.
pub const GENERATE_PATH: &str = r"^/v1beta/models/gemini-test:generateContent";

pub fn test_config(gemini_host: &str) -> AppConfig {
    AppConfig {
        storage_path: String::from("./"),
        db_path: String::from(":memory:"),
        gemini_api_hostname: gemini_host.to_string(),
        gemini_api_key: String::from("test-api-key"),
        gemini_model: TEST_MODEL.to_string(),
        app_id: String::from("test-app"),
        system_instruction: String::from("You are a study tutor."),
    }
}

/// Creates the app state backed by an in-memory database with Gemini
/// requests sent to `gemini_host`.
pub async fn test_state(gemini_host: &str) -> Arc<AppState> {
    let db = memory_db().await.expect("Failed to open in-memory db");
    Arc::new(AppState::new(db, test_config(gemini_host)))
}

/// Creates a test application router. Keep the returned state around
/// to inspect the conversation between requests.
pub async fn test_app(gemini_host: &str) -> (Router, Arc<AppState>) {
    let state = test_state(gemini_host).await;
    (app(Arc::clone(&state)), state)
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// A successful Gemini response with one grounded source.
pub fn gemini_reply(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "groundingMetadata": {
                "groundingAttributions": [
                    {"web": {"uri": "https://bio.example/osmosis", "title": "Osmosis"}}
                ]
            }
        }]
    })
    .to_string()
}

/// Poll `check` until it passes or five seconds go by.
pub async fn eventually<F: Fn() -> bool>(check: F) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Condition never became true");
}
