//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API:
//! - Groq (https://api.groq.com/openai)
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp (http://localhost:8080)
//!
//! # Configuration
//!
//! Groq (`AI_BACKEND=groq`, the default):
//! - `GROQ_API_KEY`: API key (required)
//! - `GROQ_HOST`: Server URL (default: https://api.groq.com/openai)
//! - `GROQ_MODEL`: Model name (default: llama3-8b-8192)
//!
//! Generic server (`AI_BACKEND=openai_compatible`):
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

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

pub const GROQ_DEFAULT_HOST: &str = "https://api.groq.com/openai";
pub const GROQ_DEFAULT_MODEL: &str = "llama3-8b-8192";

/// OpenAI-compatible backend
///
/// Works with any server implementing the OpenAI `/v1/chat/completions` API.
///
/// # Example
///
/// ```rust,ignore
/// // Groq
/// export GROQ_API_KEY="gsk_..."
///
/// // vLLM
/// export AI_BACKEND=openai_compatible
/// export OPENAI_COMPATIBLE_HOST="http://192.168.1.100:8000"
/// export OPENAI_COMPATIBLE_MODEL="meta-llama/Llama-3.2-3B-Instruct"
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    router: Arc<ModelRouter>,
    prompts: SharedPrompts,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            router: Arc::new(ModelRouter::default()),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new(base_url, model)
        }
    }

    /// Groq's hosted endpoint
    pub fn groq(api_key: &str, model: &str) -> Self {
        Self::with_api_key(GROQ_DEFAULT_HOST, model, api_key)
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
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

    /// Create a Groq backend from environment variables
    ///
    /// Required: `GROQ_API_KEY`
    /// Optional: `GROQ_HOST` (default: https://api.groq.com/openai)
    /// Optional: `GROQ_MODEL` (default: llama3-8b-8192)
    pub fn groq_from_env() -> Option<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let host = std::env::var("GROQ_HOST").unwrap_or_else(|_| GROQ_DEFAULT_HOST.to_string());
        let model =
            std::env::var("GROQ_MODEL").unwrap_or_else(|_| GROQ_DEFAULT_MODEL.to_string());
        Some(Self::with_api_key(&host, &model, &api_key))
    }

    /// Create from environment variables
    ///
    /// Required: `OPENAI_COMPATIBLE_HOST`
    /// Optional: `OPENAI_COMPATIBLE_MODEL` (default: gpt-3.5-turbo)
    /// Optional: `OPENAI_COMPATIBLE_API_KEY`
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OPENAI_COMPATIBLE_HOST").ok()?;
        let model = std::env::var("OPENAI_COMPATIBLE_MODEL")
            .unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        let api_key = std::env::var("OPENAI_COMPATIBLE_API_KEY").ok();

        let mut backend = Self::new(&host, &model);
        backend.api_key = api_key;
        Some(backend)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref api_key) => builder.header("Authorization", format!("Bearer {}", api_key)),
            None => builder,
        }
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn complete(&self, task: TaskType, prompt: &ChatPrompt) -> AIResult<String> {
        let config = self.router.config_for_task(task);
        let timeout = config.timeout;
        let request = ChatCompletionRequest {
            model: config.model_or(&self.model).to_string(),
            messages: prompt.messages(),
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
            stream: false,
        };

        let builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(timeout)
            .json(&request);

        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| AIError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AIError::Network(format!(
                "OpenAI API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AIError::from_reqwest(e, timeout))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AIError::MalformedResponse("No choices in completion".into()))?;

        debug!(task = task.as_str(), model = %request.model, reply = %content, "OpenAI-compatible reply");
        Ok(content)
    }

    fn prompts(&self) -> &SharedPrompts {
        &self.prompts
    }

    async fn health_check(&self) -> bool {
        // Try /v1/models first (standard OpenAI endpoint)
        let models = self
            .authorized(self.http_client.get(format!("{}/v1/models", self.base_url)))
            .send()
            .await;
        if let Ok(resp) = models {
            if resp.status().is_success() {
                return true;
            }
        }

        // Try /health (common for vLLM, LocalAI)
        if let Ok(resp) = self
            .http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
        {
            if resp.status().is_success() {
                return true;
            }
        }

        false
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn model_for_task(&self, task: TaskType) -> String {
        self.router
            .model_for_task(task)
            .unwrap_or(&self.model)
            .to_string()
    }

    fn host(&self) -> &str {
        &self.base_url
    }

    fn router_info(&self) -> RouterInfo {
        router_info_for(&self.model, &self.router)
    }
}
