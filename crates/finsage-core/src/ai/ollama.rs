//! Ollama backend implementation
//!
//! HTTP client for the Ollama chat API. Uses the model router for per-task
//! sampling settings and the prompt library for customizable prompts.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AIError;
use crate::model_router::{ModelRouter, TaskType};
use crate::prompts::PromptLibrary;

use super::types::{ChatMessage, ChatPrompt, RouterInfo, SharedPrompts};
use super::{router_info_for, AIBackend, AIResult};

/// Ollama backend with model router integration
///
/// # Configuration
///
/// Configure per-task settings via `~/.local/share/finsage/config/models.toml`:
///
/// ```toml
/// [tasks.anomaly_detection]
/// model = "llama3.1:8b"
/// timeout_secs = 90
/// ```
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    router: Arc<ModelRouter>,
    default_model: String,
    prompts: SharedPrompts,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, default_model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            router: Arc::new(ModelRouter::default()),
            default_model: default_model.to_string(),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            default_model: model.to_string(),
            ..self.clone()
        }
    }

    /// Replace the per-task settings
    pub fn with_router(mut self, router: ModelRouter) -> Self {
        self.router = Arc::new(router);
        self
    }

    /// Replace the prompt library
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Create from environment variables
    ///
    /// Required: `OLLAMA_HOST`
    /// Optional: `OLLAMA_MODEL` (default: llama3.2)
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }
}

/// Request to the Ollama chat API
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response from the Ollama chat API
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn complete(&self, task: TaskType, prompt: &ChatPrompt) -> AIResult<String> {
        let config = self.router.config_for_task(task);
        let timeout = config.timeout;
        let request = OllamaChatRequest {
            model: config.model_or(&self.default_model).to_string(),
            messages: prompt.messages(),
            stream: false,
            options: OllamaOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
        };

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| AIError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AIError::Network(format!(
                "Ollama error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AIError::from_reqwest(e, timeout))?;

        debug!(task = task.as_str(), model = %request.model, reply = %chat_response.message.content, "Ollama reply");
        Ok(chat_response.message.content)
    }

    fn prompts(&self) -> &SharedPrompts {
        &self.prompts
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    fn model_for_task(&self, task: TaskType) -> String {
        self.router
            .model_for_task(task)
            .unwrap_or(&self.default_model)
            .to_string()
    }

    fn host(&self) -> &str {
        &self.base_url
    }

    fn router_info(&self) -> RouterInfo {
        router_info_for(&self.default_model, &self.router)
    }
}
