//! FinSage Core Library
//!
//! Budgeting and spending-anomaly engine for the FinSage personal finance
//! service:
//! - Deterministic budget allocation with share ranges per category
//! - Five-rule spending anomaly detection
//! - Recommendation and advice generation from fixed tip tables
//! - Pluggable AI backends (Groq, OpenAI-compatible servers, Ollama) with
//!   a silent, typed fallback to the rules above
//! - Model router for per-task sampling settings
//! - Prompt library for customizable AI prompts
//! - Ledger helpers that turn transactions into engine inputs

pub mod ai;
pub mod anomaly;
pub mod budget;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod model_router;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod recommend;

/// Test utilities including a mock chat-completion server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, AIResult, ChatPrompt, MockBackend, MockReply, OllamaBackend,
    OpenAICompatibleBackend, RouterInfo,
};
pub use engine::{FinanceEngine, Generated, Source};
pub use error::{AIError, Error, Result};
pub use ledger::{Month, MonthlySnapshot, Transaction, TransactionType};
pub use model_router::{ModelRouter, RouterConfig, TaskConfig, TaskType};
pub use models::{
    AdviceRequest, Anomaly, AnomalyRequest, BudgetRequest, Category, CategoryAllocation,
    CategoryAmounts, Recommendation, RecommendationRequest, RecommendationType, CURRENCY,
    OVERALL_BUDGET,
};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
