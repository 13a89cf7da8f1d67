//! End-to-end tests against the HTTP router with a scripted LLM provider.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use smartscribe_node::ai::provider::{LlmError, TextGenerator};
use smartscribe_node::api::{self, AppState};
use smartscribe_node::market::MarketProxy;
use smartscribe_node::orchestrator::Orchestrator;

/// Returns the same canned text for every prompt.
struct FixedGenerator(String);

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok(self.0.clone())
    }
}

/// Fails every call with the same error.
struct FailingGenerator(LlmError);

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(self.0.clone())
    }
}

fn app_with(generator: Option<Arc<dyn TextGenerator>>) -> Router {
    let state = AppState {
        orchestrator: Orchestrator::new(generator, None),
        market: MarketProxy::new("http://127.0.0.1:9".to_string(), None),
    };
    api::router(Arc::new(state))
}

fn app_replying(text: &str) -> Router {
    app_with(Some(Arc::new(FixedGenerator(text.to_string()))))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn analyze_returns_normalized_report() {
    let reply = json!({
        "contractName": "Vault",
        "securityScore": 8.2,
        "risks": [{"title": "Unchecked call", "level": "HIGH", "description": "d"}]
    })
    .to_string();
    let app = app_replying(&reply);

    let response = app
        .oneshot(post_json("/analyze", json!({"contractCode": "contract Vault {}"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["contractName"], "Vault");
    assert_eq!(body["securityScore"], 8.2);
    // Levels are normalized to lowercase.
    assert_eq!(body["risks"][0]["level"], "high");
    assert!(body.get("degraded").is_none());
}

#[tokio::test]
async fn analyze_extracts_report_embedded_in_prose() {
    let reply = format!(
        "Sure, here is the analysis you asked for:\n{}\nLet me know if you need more.",
        json!({"contractName": "Token", "securityScore": 6.0})
    );
    let app = app_replying(&reply);

    let response = app
        .oneshot(post_json("/analyze", json!({"contractCode": "contract Token {}"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["contractName"], "Token");
    assert_eq!(body["securityScore"], 6.0);
}

#[tokio::test]
async fn analyze_degrades_to_fallback_on_unparseable_reply() {
    let app = app_replying("I cannot produce JSON today.");

    let response = app
        .oneshot(post_json("/analyze", json!({"contractCode": "contract Safe {}"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["degraded"], true);
    assert_eq!(body["contractName"], "Safe");
    assert_eq!(body["securityScore"], 7.5);
    assert_eq!(body["aiResponse"], "I cannot produce JSON today.");
}

#[tokio::test]
async fn analyze_without_input_is_bad_request() {
    let app = app_replying("{}");
    let response = app.oneshot(post_json("/analyze", json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Contract code or address is required");
}

#[tokio::test]
async fn analyze_rejects_malformed_address() {
    let app = app_replying("{}");
    let response = app
        .oneshot(post_json("/analyze", json!({"contractAddress": "0x123"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analyze_without_api_key_is_config_error() {
    let app = app_with(None);
    let response = app
        .oneshot(post_json("/analyze", json!({"contractCode": "contract A {}"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "AI service configuration error: LLM API key is missing."
    );
}

#[tokio::test(start_paused = true)]
async fn analyze_maps_persistent_overload_to_503() {
    let app = app_with(Some(Arc::new(FailingGenerator(LlmError::Overloaded(
        "503".to_string(),
    )))));
    let response = app
        .oneshot(post_json("/analyze", json!({"contractCode": "contract A {}"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "The AI model is currently overloaded after multiple attempts. Please try again later."
    );
}

#[tokio::test]
async fn chat_wraps_generator_reply() {
    let app = app_replying("Transfers tokens between accounts.");
    let response = app
        .oneshot(post_json(
            "/chat",
            json!({"message": "What does transfer do?", "contractData": {"contractName": "Token"}}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["response"], "Transfers tokens between accounts.");
}

#[tokio::test]
async fn translate_trims_the_reply() {
    let app = app_replying("  Hola mundo  \n");
    let response = app
        .oneshot(post_json(
            "/translate",
            json!({"text": "Hello world", "targetLanguage": "Spanish"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["translatedText"], "Hola mundo");
}

#[tokio::test]
async fn playground_compares_second_analysis_against_first() {
    let reply = json!({"contractName": "A", "securityScore": 5.0}).to_string();
    let state = Arc::new(AppState {
        orchestrator: Orchestrator::new(
            Some(Arc::new(FixedGenerator(reply))),
            None,
        ),
        market: MarketProxy::new("http://127.0.0.1:9".to_string(), None),
    });

    let first = api::router(state.clone())
        .oneshot(post_json(
            "/playground/analyze",
            json!({"contractCode": "contract A {}"}),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = body_json(first).await;
    assert!(first_body.get("comparison").is_none());

    let second = api::router(state.clone())
        .oneshot(post_json(
            "/playground/analyze",
            json!({"contractCode": "contract A { function f() external {} }"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second_body = body_json(second).await;
    let comparison = &second_body["comparison"];
    assert_eq!(comparison["securityScoreChange"], 0.0);
    assert!(comparison["codeChanges"].as_array().is_some());

    let reset = api::router(state.clone())
        .oneshot(post_json("/playground/reset", json!({})))
        .await
        .unwrap();
    assert_eq!(reset.status(), StatusCode::NO_CONTENT);

    let after_reset = api::router(state)
        .oneshot(post_json(
            "/playground/analyze",
            json!({"contractCode": "contract A {}"}),
        ))
        .await
        .unwrap();
    let after_body = body_json(after_reset).await;
    assert!(after_body.get("comparison").is_none());
}

#[tokio::test]
async fn playground_set_original_accepts_client_report() {
    let reply = json!({"contractName": "B", "securityScore": 4.0}).to_string();
    let state = Arc::new(AppState {
        orchestrator: Orchestrator::new(
            Some(Arc::new(FixedGenerator(reply))),
            None,
        ),
        market: MarketProxy::new("http://127.0.0.1:9".to_string(), None),
    });

    let set = api::router(state.clone())
        .oneshot(post_json(
            "/playground/original",
            json!({
                "contractCode": "contract B {}",
                "report": {"contractName": "B", "securityScore": 9.0}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(set.status(), StatusCode::OK);

    let next = api::router(state)
        .oneshot(post_json(
            "/playground/analyze",
            json!({"contractCode": "contract B { uint256 x; }"}),
        ))
        .await
        .unwrap();
    let body = body_json(next).await;
    assert_eq!(body["comparison"]["securityScoreChange"], 4.0 - 9.0);
}

#[tokio::test]
async fn playground_address_without_explorer_is_config_error() {
    let app = app_replying("{}");
    let response = app
        .oneshot(post_json(
            "/playground/analyze",
            json!({"contractAddress": "0x0000000000000000000000000000000000000001"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Etherscan API key is not configured.");
}

#[tokio::test]
async fn fetch_contract_without_explorer_key_is_config_error() {
    let app = app_with(None);
    let response = app
        .oneshot(post_json(
            "/fetch-contract",
            json!({"address": "0x0000000000000000000000000000000000000001"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Etherscan API key is not configured.");
}

#[tokio::test]
async fn market_rejects_unknown_data_type() {
    let app = app_with(None);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/market?type=bonds")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid data type requested.");
}

#[tokio::test]
async fn health_answers_ok() {
    let app = app_with(None);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}
