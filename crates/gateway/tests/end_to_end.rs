//! Router + real model client + SQLite store, with only the completion
//! endpoint scripted.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use codeweaver_config::{AuthConfig, GatewayConfig};
use codeweaver_core::error::ProviderError;
use codeweaver_core::provider::{CompletionEndpoint, CompletionRequest, EndpointReply};
use codeweaver_gateway::{AppState, ChainResolver, build_router};
use codeweaver_providers::{CodeModelClient, RetryPolicy};
use codeweaver_store::SqliteStore;
use http_body_util::BodyExt;
use tower::ServiceExt;

struct ScriptedEndpoint {
    replies: Mutex<VecDeque<Result<EndpointReply, ProviderError>>>,
    budgets: Mutex<Vec<u32>>,
}

impl ScriptedEndpoint {
    fn new(replies: Vec<Result<EndpointReply, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            budgets: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionEndpoint for ScriptedEndpoint {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: &CompletionRequest) -> Result<EndpointReply, ProviderError> {
        self.budgets.lock().unwrap().push(request.max_tokens);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Network("script exhausted".into())))
    }
}

fn completion(content: &str, finish: &str) -> Result<EndpointReply, ProviderError> {
    let body = serde_json::json!({
        "choices": [{ "message": { "content": content }, "finish_reason": finish }]
    });
    Ok(EndpointReply::new(200, body.to_string()))
}

async fn app(endpoint: Arc<ScriptedEndpoint>) -> axum::Router {
    let policy = RetryPolicy {
        length_retry_pause: Duration::from_millis(1),
        backoff_unit: Duration::from_millis(1),
        ..RetryPolicy::default()
    };
    let generator = CodeModelClient::new(endpoint, "openai/gpt-oss-20b", policy);
    let store = SqliteStore::new("sqlite::memory:", 1).await.unwrap();
    let auth = AuthConfig {
        tokens: HashMap::from([("tok_bob".to_string(), "user_bob".to_string())]),
        ..AuthConfig::default()
    };

    let state = Arc::new(AppState {
        generator: Arc::new(generator),
        store: Arc::new(store),
        resolver: Arc::new(ChainResolver::from_config(&auth)),
        allow_anonymous: false,
        generation_timeout: None,
    });
    build_router(state, &GatewayConfig::default())
}

async fn call(app: &axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn generate(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .header("authorization", "Bearer tok_bob")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn history(query: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/api/history{query}"))
        .header("authorization", "Bearer tok_bob")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn retried_generation_is_persisted_and_listed() {
    let endpoint = ScriptedEndpoint::new(vec![
        Ok(EndpointReply::new(502, "bad gateway")),
        completion("public class A {", "length"),
        completion("  public class A {}  ", "stop"),
    ]);
    let app = app(endpoint.clone()).await;

    let (status, json) = call(
        &app,
        generate(serde_json::json!({ "prompt": "empty class", "language": "java" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["code"], "public class A {}");
    assert_eq!(*endpoint.budgets.lock().unwrap(), vec![800, 800, 1600]);

    let (status, json) = call(&app, history("")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalPages"], 1);
    assert_eq!(json["currentPage"], 1);
    assert_eq!(json["data"][0]["prompt"], "empty class");
    assert_eq!(json["data"][0]["language"], "java");
}

#[tokio::test]
async fn retired_model_stores_fallback() {
    let endpoint = ScriptedEndpoint::new(vec![Ok(EndpointReply::new(404, "not found"))]);
    let app = app(endpoint.clone()).await;

    let (status, json) = call(
        &app,
        generate(serde_json::json!({ "prompt": "fizzbuzz", "language": "javascript" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        json["data"]["code"],
        "// [ERROR] API failed. Here is a fallback.\n// Prompt: fizzbuzz\n\n// Check server logs for HTTP errors.\n"
    );
    assert_eq!(endpoint.budgets.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_output_is_truncated_before_storage() {
    let huge = "x".repeat(200_010);
    let endpoint = ScriptedEndpoint::new(vec![completion(&huge, "stop")]);
    let app = app(endpoint).await;

    let (status, _) = call(
        &app,
        generate(serde_json::json!({ "prompt": "big", "language": "python" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = call(&app, history("?limit=1")).await;
    let code = json["data"][0]["code"].as_str().unwrap();
    assert!(code.ends_with("\n/* truncated */"));
    assert_eq!(code.chars().count(), 200_000 + "\n/* truncated */".len());
}
