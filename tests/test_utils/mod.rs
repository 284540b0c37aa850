//! Test utilities for integration tests
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use music_advisor::ai::{ProviderKind, ProviderRegistry};
use music_advisor::api::{AppState, SharedState, app};
use music_advisor::core::{AppConfig, ProviderConfig};

pub const SYSTEM_MESSAGE: &str = "You are a music advisor.";

/// Config with Groq and Anthropic pointed at mock servers
pub fn test_config(groq_hostname: &str, anthropic_hostname: &str) -> AppConfig {
    AppConfig {
        providers: vec![
            ProviderConfig {
                kind: ProviderKind::Groq,
                api_key: String::from("test-groq-key"),
                api_hostname: groq_hostname.to_string(),
                models: vec![String::from("llama-a"), String::from("llama-b")],
            },
            ProviderConfig {
                kind: ProviderKind::Anthropic,
                api_key: String::from("test-anthropic-key"),
                api_hostname: anthropic_hostname.to_string(),
                models: vec![String::from("claude-a")],
            },
        ],
        system_message: String::from(SYSTEM_MESSAGE),
        web_ui_path: String::from("./web-ui"),
        session_idle_timeout: Duration::from_secs(60 * 60),
    }
}

/// Creates a test application router
pub fn test_app(config: AppConfig) -> Router {
    test_app_with_state(config).0
}

/// Creates a test application router along with its shared state so
/// tests can reach behind the API
pub fn test_app_with_state(config: AppConfig) -> (Router, SharedState) {
    let registry = ProviderRegistry::from_config(&config).expect("Failed to build registry");
    let app_state = AppState::new(config, registry);
    let shared_state = Arc::new(RwLock::new(app_state));
    (app(Arc::clone(&shared_state)), shared_state)
}

/// Poison the state lock the way a panicking handler would
pub fn poison_state(state: &SharedState) {
    let state = Arc::clone(state);
    let _ = std::thread::spawn(move || {
        let _guard = state.write().unwrap();
        panic!("handler panicked while holding the state lock");
    })
    .join();
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

pub async fn body_to_json(body: Body) -> Value {
    serde_json::from_str(&body_to_string(body).await).expect("Body is not JSON")
}

/// Split a server-sent events body into (event name, JSON data) pairs.
/// Keep-alive comments carry no data and are skipped.
pub fn sse_events(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|raw| {
            let mut name = String::from("message");
            let mut data = None;
            for line in raw.lines() {
                if let Some(n) = line.strip_prefix("event:") {
                    name = n.trim().to_string();
                } else if let Some(d) = line.strip_prefix("data:") {
                    data = Some(d.trim().to_string());
                }
            }
            let value = serde_json::from_str(&data?).ok()?;
            Some((name, value))
        })
        .collect()
}

pub async fn create_session(app: &Router) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/sessions")
                .method("POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_to_json(response.into_body()).await
}

pub async fn get_session(app: &Router, id: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_string(response.into_body()).await)
}

/// POST a message and read the whole event stream
pub async fn send_message(app: &Router, id: &str, message: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{}/messages", id))
                .method("POST")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "message": message }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_string(response.into_body()).await)
}

/// A streamed OpenAI compatible completion yielding `fragments`
pub fn openai_sse(fragments: &[&str]) -> String {
    let mut body = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        let chunk = serde_json::json!({
            "id": format!("chunk{}", i),
            "object": "chat.completion.chunk",
            "created": 1234567890,
            "model": "llama-a",
            "choices": [{"index": 0, "delta": {"content": fragment}, "finish_reason": null}]
        });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
