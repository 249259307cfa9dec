//! Test utilities for finsage-core
//!
//! Provides a mock chat-completion server that speaks both the OpenAI
//! (`/v1/chat/completions`) and Ollama (`/api/chat`) dialects, so backends
//! can be exercised over real HTTP without a model.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::ai::ChatMessage;

/// Reply the mock server gives to every chat request until re-scripted
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    pub content: String,
    pub status: u16,
    pub delay: Option<Duration>,
}

impl ScriptedReply {
    /// Successful reply with the given assistant content
    pub fn content(text: &str) -> Self {
        Self {
            content: text.to_string(),
            status: 200,
            delay: None,
        }
    }

    /// Error status with no content
    pub fn status(status: u16) -> Self {
        Self {
            content: String::new(),
            status,
            delay: None,
        }
    }

    /// Successful reply sent only after `delay`
    pub fn delayed(text: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::content(text)
        }
    }
}

/// A chat request as seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub model: String,
    pub authorization: Option<String>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug)]
struct ServerState {
    reply: ScriptedReply,
    requests: Vec<RecordedRequest>,
}

type SharedState = Arc<Mutex<ServerState>>;

/// Mock chat-completion server for testing and development
pub struct MockChatServer {
    addr: SocketAddr,
    state: SharedState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockChatServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(ServerState {
            reply: ScriptedReply::content("[]"),
            requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_openai_chat))
            .route("/api/tags", get(handle_tags))
            .route("/api/chat", post(handle_ollama_chat))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Set the reply for subsequent chat requests
    pub fn script(&self, reply: ScriptedReply) {
        self.state.lock().unwrap().reply = reply;
    }

    /// Chat requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockChatServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Record the request and return the current script
fn record(state: &SharedState, path: &str, headers: &HeaderMap, body: &Value) -> ScriptedReply {
    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        path: path.to_string(),
        model: body["model"].as_str().unwrap_or_default().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        messages: serde_json::from_value(body["messages"].clone()).unwrap_or_default(),
    });
    state.reply.clone()
}

/// Apply the scripted delay and status; `Err` carries the error response
async fn play(reply: &ScriptedReply) -> Result<(), Response> {
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }
    if reply.status != 200 {
        let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Err((status, "scripted failure").into_response());
    }
    Ok(())
}

async fn handle_openai_chat(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let reply = record(&state, "/v1/chat/completions", &headers, &body);
    if let Err(response) = play(&reply).await {
        return response;
    }

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": body["model"],
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": reply.content},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

async fn handle_ollama_chat(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let reply = record(&state, "/api/chat", &headers, &body);
    if let Err(response) = play(&reply).await {
        return response;
    }

    Json(json!({
        "model": body["model"],
        "message": {"role": "assistant", "content": reply.content},
        "done": true
    }))
    .into_response()
}

/// OpenAI models endpoint (health check)
async fn handle_models() -> Json<Value> {
    Json(json!({"object": "list", "data": [{"id": "mock-model", "object": "model"}]}))
}

/// Ollama tags endpoint (health check)
async fn handle_tags() -> Json<Value> {
    Json(json!({"models": [{"name": "llama3.2:latest", "size": 2_000_000_000u64}]}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockChatServer::start().await;
        let url = server.url();
        assert!(url.starts_with("http://127.0.0.1:"));

        let resp = reqwest::get(format!("{}/api/tags", url)).await.unwrap();
        assert!(resp.status().is_success());
    }

    #[tokio::test]
    async fn test_mock_server_records_chat() {
        let server = MockChatServer::start().await;
        server.script(ScriptedReply::content("hello"));

        let resp: Value = reqwest::Client::new()
            .post(format!("{}/v1/chat/completions", server.url()))
            .json(&json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(resp["choices"][0]["message"]["content"], "hello");
        let requests = server.requests();
        assert_eq!(requests[0].model, "m");
        assert_eq!(requests[0].messages[0].content, "hi");
    }
}
