use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use manual_rag::core::config::{AppConfig, AppPaths};
use manual_rag::core::errors::ApiError;
use manual_rag::llm::{Embedder, Generation, GenerationConfig, LlmProvider};
use manual_rag::rag::{ImageStore, Retriever, TextChunk, TextStore};
use manual_rag::server::router::router;
use manual_rag::state::AppState;

/// Greets on "hello", otherwise answers from the manual.
struct FakeProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(
        &self,
        prompt: &str,
        _config: GenerationConfig,
    ) -> Result<Generation, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = if prompt.starts_with("You are an AI assistant classifier") {
            if prompt.contains("\"hello\"") {
                "casual"
            } else {
                "manual"
            }
        } else if prompt.starts_with("Rewrite the following draft") {
            "Open the breaker before service (page 4)."
        } else if prompt.contains("--- Manual Excerpts ---") {
            "Open breaker, page 4."
        } else {
            "Hello! How can I help with the manual?"
        };

        Ok(Generation {
            text: text.to_string(),
            usage: Some(json!({ "promptTokenCount": 5, "candidatesTokenCount": 3, "totalTokenCount": 8 })),
        })
    }
}

struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake"
    }

    async fn embed_texts(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs.iter().map(|_| vec![0.6, 0.8]).collect())
    }

    async fn embed_images(&self, paths: &[PathBuf]) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(paths.iter().map(|_| vec![0.6, 0.8]).collect())
    }
}

struct TestServer {
    base_url: String,
    provider: Arc<FakeProvider>,
    _root: tempfile::TempDir,
}

async fn spawn_server() -> TestServer {
    let root = tempfile::tempdir().expect("tempdir");
    let config = AppConfig::default();
    let paths = AppPaths::with_root(root.path().to_path_buf(), &config.paths);

    let text_store = TextStore::new(
        vec![TextChunk {
            id: 0,
            text: "Open the main breaker before servicing the cabinet.".to_string(),
            page: 4,
        }],
        vec![vec![0.6, 0.8]],
    )
    .expect("text store");
    let retriever = Retriever::new(
        Arc::new(text_store),
        Arc::new(ImageStore::empty()),
        Arc::new(FakeEmbedder),
        Arc::new(FakeEmbedder),
    );

    let provider = Arc::new(FakeProvider {
        calls: AtomicUsize::new(0),
    });
    let state = AppState::from_parts(config, paths, provider.clone(), retriever);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.expect("serve");
    });

    TestServer {
        base_url: format!("http://{}", addr),
        provider,
        _root: root,
    }
}

#[tokio::test]
async fn ask_without_query_is_rejected() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    for body in ["{}", r#"{"query": ""}"#, "garbage"] {
        let response = client
            .post(format!("{}/api/ask", server.base_url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("request");

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let payload: Value = response.json().await.expect("json");
        assert_eq!(payload["error"], "query required");
    }
    assert_eq!(server.provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn whitespace_query_is_answered_not_rejected() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/ask", server.base_url))
        .json(&json!({ "query": "   " }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("json");
    assert_eq!(payload["sources"]["user_query"], "   ");
    assert!(server.provider.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn casual_question_is_answered_and_logged() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/ask", server.base_url))
        .json(&json!({ "query": "hello" }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let payload: Value = response.json().await.expect("json");
    assert!(!payload["answer"].as_str().unwrap_or_default().is_empty());
    assert_eq!(payload["sources"]["user_query"], "hello");

    let history: Vec<Value> = client
        .get(format!("{}/api/history", server.base_url))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn manual_question_runs_draft_and_polish() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let payload: Value = client
        .post(format!("{}/api/ask", server.base_url))
        .json(&json!({ "query": "How do I service the cabinet?" }))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");

    assert_eq!(payload["answer"], "Open the breaker before service (page 4).");
    assert_eq!(payload["sources"]["raw_answer"], "Open breaker, page 4.");
    assert_eq!(payload["sources"]["retrieved_chunks"][0]["page"], 4);
    assert_eq!(payload["sources"]["metrics"]["precision"], 1.0);
    assert_eq!(server.provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn chat_page_renders_history_and_accepts_forms() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let page = client
        .get(&server.base_url)
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("text");
    assert!(page.contains("<form method=\"post\" action=\"/\">"));

    let page = client
        .post(&server.base_url)
        .header("content-type", "application/x-www-form-urlencoded")
        .body("query=+hello+")
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("text");
    assert!(page.contains("Hello! How can I help with the manual?"));

    // Blank submissions only re-render.
    let response = client
        .post(&server.base_url)
        .header("content-type", "application/x-www-form-urlencoded")
        .body("query=+++")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(server.provider.calls.load(Ordering::SeqCst), 2);

    // Padded form input is trimmed before it reaches the generator.
    let history: Vec<Value> = client
        .get(format!("{}/api/history", server.base_url))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(history[0]["user_query"], "hello");
}

#[tokio::test]
async fn health_reports_store_sizes() {
    let server = spawn_server().await;

    let payload: Value = reqwest::get(format!("{}/health", server.base_url))
        .await
        .expect("request")
        .json()
        .await
        .expect("json");

    assert_eq!(payload, json!({ "status": "ok", "text_chunks": 1, "images": 0 }));
}
