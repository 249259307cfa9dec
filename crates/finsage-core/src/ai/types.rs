//! AI backend request/response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::prompts::PromptLibrary;

/// Prompt library shared between clones of a backend
pub type SharedPrompts = Arc<RwLock<PromptLibrary>>;

/// Router configuration information for display
#[derive(Debug, Clone, Serialize)]
pub struct RouterInfo {
    /// Model used unless a task overrides it
    pub default_model: String,
    /// Task-specific model overrides (only non-default)
    pub task_models: Vec<(String, String)>,
}

/// A rendered prompt ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPrompt {
    pub system: Option<String>,
    pub user: String,
}

/// Chat message in the OpenAI / Ollama chat shape
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatPrompt {
    /// System message (if any) followed by the user message
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: self.user.clone(),
        });
        messages
    }
}
