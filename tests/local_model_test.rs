//! Local inference endpoint tests.
//!
//! Local failures must never surface as errors: the orchestrator returns a
//! low-confidence placeholder instead and does not cache it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assay::providers::{LocalReply, LocalRequest, LocalTransport};
use assay::{AiRequest, Assay, AssayError, Language, MapConfig, Orchestrator, Result};

fn local_config(endpoint: &str) -> MapConfig {
    MapConfig::new()
        .set("useLocalModel", true)
        .set("localModelEndpoint", endpoint)
        .set("temperature", 0.5)
        .set("maxTokens", 64)
}

fn build(endpoint: &str) -> Orchestrator {
    Assay::builder()
        .config(&local_config(endpoint))
        .build()
        .unwrap()
}

fn request() -> AiRequest {
    AiRequest::new("def add(a, b): return a + b", Language::Python)
}

#[tokio::test]
async fn http_error_degrades_to_low_confidence_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let orchestrator = build(&format!("{}/v1/chat/completions", server.uri()));
    let response = orchestrator
        .get_enhanced_suggestions(&request(), None)
        .await
        .unwrap();

    assert_eq!(response.confidence, Some(0.1));
    assert_eq!(response.explanation.as_deref(), Some("Local model error"));
    assert_eq!(
        response.suggestions,
        vec!["Error querying local model: Internal Server Error"]
    );

    // Degraded responses are not cached.
    orchestrator
        .get_enhanced_suggestions(&request(), None)
        .await
        .unwrap();
    assert!(orchestrator.cache().is_empty());
}

#[tokio::test]
async fn error_body_message_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"error": {"message": "model loading"}})),
        )
        .mount(&server)
        .await;

    let orchestrator = build(&server.uri());
    let response = orchestrator.explain_code(&request(), None).await.unwrap();

    assert_eq!(
        response.primary(),
        Some("Error querying local model: model loading")
    );
}

#[tokio::test]
async fn single_shot_payload_is_parsed_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_partial_json(json!({
            "temperature": 0.5,
            "max_tokens": 64,
            "stream": false,
            "messages": [
                {"role": "system", "content": "Generate unit tests for the following code:\n\ndef add(a, b): return a + b"},
                {"role": "user", "content": "def add(a, b): return a + b"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "def test_add(): ..."}}],
            "tests": [{"name": "test_add", "passes": true}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let orchestrator = build(&format!("{}/generate", server.uri()));
    let response = orchestrator.generate_tests(&request(), None).await.unwrap();

    assert_eq!(response.suggestions, vec!["def test_add(): ..."]);
    assert_eq!(response.explanation.as_deref(), Some("assistant"));
    assert_eq!(response.confidence, Some(0.9));
    assert_eq!(
        response.tests,
        Some(json!([{"name": "test_add", "passes": true}]))
    );

    let again = orchestrator.generate_tests(&request(), None).await.unwrap();
    assert_eq!(again, response);
}

#[tokio::test]
async fn streamed_body_is_delivered_incrementally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw("Größe → ok", "text/plain"))
        .mount(&server)
        .await;

    let orchestrator = build(&server.uri());
    let mut seen = String::new();
    let mut on_chunk = |chunk: &str| seen.push_str(chunk);
    let response = orchestrator
        .explain_code(&request(), Some(&mut on_chunk))
        .await
        .unwrap();

    assert_eq!(seen, "Größe → ok");
    assert_eq!(response.suggestions, vec!["Größe → ok"]);
    assert_eq!(response.explanation.as_deref(), Some("Local model response"));
    assert_eq!(response.confidence, Some(0.9));
}

#[tokio::test]
async fn local_path_needs_no_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "fine"}}]
        })))
        .mount(&server)
        .await;

    // No apiKey configured and nothing in the secret store.
    let orchestrator = build(&server.uri());
    let response = orchestrator.explain_code(&request(), None).await.unwrap();
    assert_eq!(response.primary(), Some("fine"));
}

// ============================================================================
// Endpoint validation
// ============================================================================

struct CountingTransport {
    posts: AtomicUsize,
}

#[async_trait]
impl LocalTransport for CountingTransport {
    async fn post(&self, _endpoint: &str, _request: &LocalRequest) -> Result<LocalReply> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        Ok(LocalReply::Complete(json!({})))
    }
}

#[tokio::test]
async fn non_http_endpoint_degrades_without_posting() {
    let transport = Arc::new(CountingTransport {
        posts: AtomicUsize::new(0),
    });
    let orchestrator = Assay::builder()
        .config(&local_config("localhost:8080/v1/chat/completions"))
        .local_transport(transport.clone())
        .build()
        .unwrap();

    let response = orchestrator.explain_code(&request(), None).await.unwrap();

    assert_eq!(response.confidence, Some(0.1));
    assert!(
        response
            .primary()
            .unwrap()
            .starts_with("Error querying local model:")
    );
    assert_eq!(transport.posts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn enabling_local_model_without_endpoint_fails_to_build() {
    let result = Assay::builder()
        .config(&MapConfig::new().set("useLocalModel", true))
        .build();
    assert!(matches!(result, Err(AssayError::LocalModel(_))));
}

#[tokio::test]
async fn unreachable_endpoint_degrades() {
    let orchestrator = build("http://127.0.0.1:1/v1/chat/completions");
    let response = orchestrator.explain_code(&request(), None).await.unwrap();
    assert_eq!(response.confidence, Some(0.1));
    assert_eq!(response.explanation.as_deref(), Some("Local model error"));
}
