//! Pluggable AI backend abstraction
//!
//! Every engine operation has a model-backed path and a deterministic
//! fallback. This module is the model-backed half: it renders a prompt,
//! sends it to a chat-completion backend, and validates the reply.
//!
//! # Architecture
//!
//! - `AIBackend` trait: transport (`complete`) plus default methods that
//!   render, call and parse for each engine operation
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend` (Groq and friends),
//!   `OllamaBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_env();
//!
//! if let Some(ref client) = ai {
//!     let plan = client.generate_budget_plan(&request).await?;
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (groq, openai_compatible, ollama, mock). Default: groq
//! - `GROQ_API_KEY`: Groq API key (required for groq backend)
//! - `GROQ_HOST`: Groq URL (default: https://api.groq.com/openai)
//! - `GROQ_MODEL`: Model name (default: llama3-8b-8192)
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod prompting;
pub mod types;

pub use mock::{MockBackend, MockReply};
pub use ollama::OllamaBackend;
pub use openai_compatible::{OpenAICompatibleBackend, GROQ_DEFAULT_HOST, GROQ_DEFAULT_MODEL};
pub use types::*;

use async_trait::async_trait;

use crate::error::AIError;
use crate::model_router::{ModelRouter, TaskType};
use crate::models::{
    AdviceRequest, Anomaly, AnomalyRequest, BudgetRequest, CategoryAllocation, Recommendation,
    RecommendationRequest,
};

pub type AIResult<T> = std::result::Result<T, AIError>;

/// Trait defining the interface for all AI backends
///
/// Backends only provide transport. The per-operation methods have default
/// implementations so every backend renders and validates the same way.
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Send one rendered prompt and return the raw reply text
    async fn complete(&self, task: TaskType, prompt: &ChatPrompt) -> AIResult<String>;

    /// Prompt library used to render requests
    fn prompts(&self) -> &SharedPrompts;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the default model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;

    /// Get router configuration info
    fn router_info(&self) -> RouterInfo;

    /// Model actually used for a task
    fn model_for_task(&self, _task: TaskType) -> String {
        self.model().to_string()
    }

    /// Category allocations, reconciled so they never exceed spendable income
    async fn generate_budget_plan(
        &self,
        request: &BudgetRequest,
    ) -> AIResult<Vec<CategoryAllocation>> {
        let prompt = prompting::budget_prompt(self.prompts(), request)?;
        let reply = self.complete(TaskType::BudgetPlan, &prompt).await?;
        parsing::parse_budget_reply(&reply, request.spendable())
    }

    /// Spending anomalies; an empty list is a valid answer
    async fn detect_anomalies(&self, request: &AnomalyRequest) -> AIResult<Vec<Anomaly>> {
        let prompt = prompting::anomaly_prompt(self.prompts(), request)?;
        let reply = self.complete(TaskType::AnomalyDetection, &prompt).await?;
        parsing::parse_anomaly_reply(&reply)
    }

    /// Typed recommendations
    async fn generate_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> AIResult<Vec<Recommendation>> {
        let prompt = prompting::recommendation_prompt(self.prompts(), request)?;
        let reply = self.complete(TaskType::Recommendations, &prompt).await?;
        parsing::parse_recommendation_reply(&reply)
    }

    /// Free-text advice
    async fn financial_advice(&self, request: &AdviceRequest) -> AIResult<String> {
        let prompt = prompting::advice_prompt(self.prompts(), request)?;
        let reply = self.complete(TaskType::FinancialAdvice, &prompt).await?;
        parsing::parse_advice_reply(&reply)
    }
}

/// Summarize a router for display, listing only non-default models
pub(crate) fn router_info_for(default_model: &str, router: &ModelRouter) -> RouterInfo {
    let task_models = TaskType::all()
        .iter()
        .filter_map(|task| {
            router
                .model_for_task(*task)
                .filter(|model| *model != default_model)
                .map(|model| (task.as_str().to_string(), model.to_string()))
        })
        .collect();

    RouterInfo {
        default_model: default_model.to_string(),
        task_models,
    }
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
/// All variants implement the same AIBackend operations.
#[derive(Clone)]
pub enum AIClient {
    /// Groq or any other server speaking the OpenAI chat completions API
    OpenAICompatible(OpenAICompatibleBackend),
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `groq` (default): Uses GROQ_API_KEY, GROQ_HOST and GROQ_MODEL
    /// - `openai_compatible`: Uses OPENAI_COMPATIBLE_HOST and OPENAI_COMPATIBLE_MODEL
    ///   (works with vLLM, LocalAI, llama-server, etc.)
    /// - `ollama`: Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set, in
    /// which case the engine runs rule-based only.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "groq".to_string());

        match backend.to_lowercase().as_str() {
            "groq" => OpenAICompatibleBackend::groq_from_env().map(AIClient::OpenAICompatible),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to groq");
                OpenAICompatibleBackend::groq_from_env().map(AIClient::OpenAICompatible)
            }
        }
    }

    /// Create a Groq backend directly
    pub fn groq(api_key: &str, model: &str) -> Self {
        AIClient::OpenAICompatible(OpenAICompatibleBackend::groq(api_key, model))
    }

    /// Create an OpenAI-compatible backend directly
    pub fn openai_compatible(host: &str, model: &str, api_key: Option<&str>) -> Self {
        let backend = match api_key {
            Some(key) => OpenAICompatibleBackend::with_api_key(host, model, key),
            None => OpenAICompatibleBackend::new(host, model),
        };
        AIClient::OpenAICompatible(backend)
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    ///
    /// Used for runtime model override (e.g. `--model` on the command line)
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }

    /// Backend kind, for display
    pub fn kind(&self) -> &'static str {
        match self {
            AIClient::OpenAICompatible(_) => "openai_compatible",
            AIClient::Ollama(_) => "ollama",
            AIClient::Mock(_) => "mock",
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn complete(&self, task: TaskType, prompt: &ChatPrompt) -> AIResult<String> {
        match self {
            AIClient::OpenAICompatible(b) => b.complete(task, prompt).await,
            AIClient::Ollama(b) => b.complete(task, prompt).await,
            AIClient::Mock(b) => b.complete(task, prompt).await,
        }
    }

    fn prompts(&self) -> &SharedPrompts {
        match self {
            AIClient::OpenAICompatible(b) => b.prompts(),
            AIClient::Ollama(b) => b.prompts(),
            AIClient::Mock(b) => b.prompts(),
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }

    fn router_info(&self) -> RouterInfo {
        match self {
            AIClient::OpenAICompatible(b) => b.router_info(),
            AIClient::Ollama(b) => b.router_info(),
            AIClient::Mock(b) => b.router_info(),
        }
    }

    fn model_for_task(&self, task: TaskType) -> String {
        match self {
            AIClient::OpenAICompatible(b) => b.model_for_task(task),
            AIClient::Ollama(b) => b.model_for_task(task),
            AIClient::Mock(b) => b.model_for_task(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::model_router::{RouterConfig, TaskConfig};
    use crate::models::Category;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
        assert_eq!(client.kind(), "mock");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_default_methods_parse_mock_replies() {
        let client = AIClient::mock();
        let request = BudgetRequest::new(50000.0, 10000.0);

        let plan = client.generate_budget_plan(&request).await.unwrap();
        assert_eq!(plan.len(), Category::all().len());
        let total: f64 = plan.iter().map(|a| a.allocated_amount).sum();
        assert!(total <= request.spendable() + 0.01);

        let recs = client
            .generate_recommendations(&RecommendationRequest::default())
            .await
            .unwrap();
        assert!(!recs.is_empty());

        let advice = client
            .financial_advice(&AdviceRequest::default())
            .await
            .unwrap();
        assert!(!advice.is_empty());
    }

    #[tokio::test]
    async fn test_scripted_garbage_is_rejected() {
        let mock = MockBackend::new().with_reply(TaskType::AnomalyDetection, "no anomalies here!");
        let client = AIClient::Mock(mock.clone());

        let err = client
            .detect_anomalies(&AnomalyRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_response");

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, TaskType::AnomalyDetection);
        assert!(calls[0].1.system.is_some());
    }

    #[test]
    fn test_router_info_lists_overrides_only() {
        let mut tasks = HashMap::new();
        tasks.insert(
            TaskType::AnomalyDetection,
            TaskConfig {
                model: Some("llama3-70b-8192".into()),
                ..TaskConfig::defaults_for(TaskType::AnomalyDetection)
            },
        );
        tasks.insert(
            TaskType::BudgetPlan,
            TaskConfig {
                model: Some("llama3-8b-8192".into()),
                ..TaskConfig::defaults_for(TaskType::BudgetPlan)
            },
        );
        let router = ModelRouter::with_config(RouterConfig {
            tasks,
            ..RouterConfig::default()
        });

        let info = router_info_for("llama3-8b-8192", &router);
        assert_eq!(info.default_model, "llama3-8b-8192");
        assert_eq!(
            info.task_models,
            vec![(
                "anomaly_detection".to_string(),
                "llama3-70b-8192".to_string()
            )]
        );
    }

    #[test]
    fn test_with_model() {
        let client = AIClient::groq("gsk-test", GROQ_DEFAULT_MODEL).with_model("llama3-70b-8192");
        assert_eq!(client.model(), "llama3-70b-8192");
        assert_eq!(client.host(), GROQ_DEFAULT_HOST);
        assert_eq!(client.kind(), "openai_compatible");
    }
}
