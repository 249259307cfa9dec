//! Mock backend for testing
//!
//! Returns canned replies for every task without a running model server.
//! Replies can be scripted per task, either as raw text (which still goes
//! through the real reply parsers) or as a transport failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::error::AIError;
use crate::model_router::TaskType;
use crate::prompts::PromptLibrary;

use super::types::{ChatPrompt, RouterInfo, SharedPrompts};
use super::{AIBackend, AIResult};

const BUDGET_REPLY: &str = r#"[
  {"category": "Rent", "allocated_amount": 30},
  {"category": "Food", "allocated_amount": 15},
  {"category": "Bills", "allocated_amount": 10},
  {"category": "Transport", "allocated_amount": 8},
  {"category": "Healthcare", "allocated_amount": 7},
  {"category": "Education", "allocated_amount": 8},
  {"category": "Shopping", "allocated_amount": 8},
  {"category": "Entertainment", "allocated_amount": 7},
  {"category": "Other", "allocated_amount": 7}
]"#;

const RECOMMENDATIONS_REPLY: &str = r#"[
  {"category": "Savings Tip", "message": "Automate a monthly transfer to savings.", "type": "info"}
]"#;

const ADVICE_REPLY: &str = "1. Automate your savings on salary day.";

/// Scripted outcome for one task
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw reply text, parsed like a real model reply
    Text(String),
    /// Transport-level failure
    Fail(AIError),
}

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    replies: Arc<Mutex<HashMap<TaskType, MockReply>>>,
    calls: Arc<Mutex<Vec<(TaskType, ChatPrompt)>>>,
    prompts: SharedPrompts,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            replies: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(RwLock::new(PromptLibrary::embedded_only())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a new instance reporting a different model name
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Script the raw reply text for a task
    pub fn with_reply(self, task: TaskType, text: &str) -> Self {
        self.script(task, MockReply::Text(text.to_string()));
        self
    }

    /// Script a failure for a task
    pub fn failing(self, task: TaskType, error: AIError) -> Self {
        self.script(task, MockReply::Fail(error));
        self
    }

    /// Script a task on a shared mock (visible to all clones)
    pub fn script(&self, task: TaskType, reply: MockReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.insert(task, reply);
        }
    }

    /// Every prompt sent so far, in order
    pub fn calls(&self) -> Vec<(TaskType, ChatPrompt)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn canned_reply(task: TaskType) -> &'static str {
        match task {
            TaskType::BudgetPlan => BUDGET_REPLY,
            TaskType::AnomalyDetection => "[]",
            TaskType::Recommendations => RECOMMENDATIONS_REPLY,
            TaskType::FinancialAdvice => ADVICE_REPLY,
        }
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, task: TaskType, prompt: &ChatPrompt) -> AIResult<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((task, prompt.clone()));
        }

        let scripted = self
            .replies
            .lock()
            .ok()
            .and_then(|replies| replies.get(&task).cloned());

        match scripted {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(err)) => Err(err),
            None => Ok(Self::canned_reply(task).to_string()),
        }
    }

    fn prompts(&self) -> &SharedPrompts {
        &self.prompts
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }

    fn router_info(&self) -> RouterInfo {
        RouterInfo {
            default_model: self.model.clone(),
            task_models: vec![],
        }
    }
}
