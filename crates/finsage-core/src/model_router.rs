//! Per-task model settings
//!
//! Each engine operation is a task with its own sampling settings, timeout
//! and (optionally) a model that differs from the backend's default.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/finsage/config/models.toml)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/models.toml");

/// Task types for model routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Category allocations (JSON)
    BudgetPlan,
    /// Flagged spending issues (JSON)
    AnomalyDetection,
    /// Per-category tips (JSON)
    Recommendations,
    /// Free-text advice
    FinancialAdvice,
}

impl TaskType {
    /// Get the config key for this task type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetPlan => "budget_plan",
            Self::AnomalyDetection => "anomaly_detection",
            Self::Recommendations => "recommendations",
            Self::FinancialAdvice => "financial_advice",
        }
    }

    /// Get all task types
    pub fn all() -> &'static [TaskType] {
        &[
            Self::BudgetPlan,
            Self::AnomalyDetection,
            Self::Recommendations,
            Self::FinancialAdvice,
        ]
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Config(format!("Unknown task type: {}", s)))
    }
}

/// Configuration for a specific task type
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    /// Model override; `None` uses the backend's model
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound on the whole request
    pub timeout: Duration,
}

impl TaskConfig {
    /// Built-in settings for a task
    pub fn defaults_for(task: TaskType) -> Self {
        let (temperature, max_tokens) = match task {
            TaskType::BudgetPlan => (0.2, 1000),
            TaskType::AnomalyDetection => (0.3, 2000),
            TaskType::Recommendations => (0.4, 1500),
            TaskType::FinancialAdvice => (0.5, 1000),
        };
        Self {
            model: None,
            temperature,
            max_tokens,
            timeout: Duration::from_secs(30),
        }
    }

    /// The model to call: this task's override or the backend default
    pub fn model_or<'a>(&'a self, default_model: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default_model)
    }
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Default timeout
    pub default_timeout: Duration,
    /// Per-task configurations
    pub tasks: HashMap<TaskType, TaskConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            tasks: HashMap::new(),
        }
    }
}

/// Model Router for task-based settings
#[derive(Debug, Clone)]
pub struct ModelRouter {
    config: RouterConfig,
    config_path: Option<PathBuf>,
}

impl ModelRouter {
    /// Create a new model router with default configuration
    pub fn new() -> Result<Self> {
        let config = load_config(None)?;
        Ok(Self {
            config,
            config_path: default_config_path(),
        })
    }

    /// Create with a custom config path
    pub fn with_config_path(path: PathBuf) -> Result<Self> {
        let config = load_config(Some(&path))?;
        Ok(Self {
            config,
            config_path: Some(path),
        })
    }

    /// Create with an explicit configuration (for testing)
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    /// Get the full task configuration
    pub fn config_for_task(&self, task: TaskType) -> TaskConfig {
        self.config.tasks.get(&task).cloned().unwrap_or_else(|| TaskConfig {
            timeout: self.config.default_timeout,
            ..TaskConfig::defaults_for(task)
        })
    }

    /// Get the model override for a task, if any
    pub fn model_for_task(&self, task: TaskType) -> Option<&str> {
        self.config
            .tasks
            .get(&task)
            .and_then(|c| c.model.as_deref())
    }

    /// Get the timeout for a task
    pub fn timeout_for_task(&self, task: TaskType) -> Duration {
        self.config
            .tasks
            .get(&task)
            .map(|c| c.timeout)
            .unwrap_or(self.config.default_timeout)
    }

    /// Get the router configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Get the config path (if using file-based config)
    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> Result<()> {
        self.config = load_config(self.config_path.as_ref())?;
        Ok(())
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_config(RouterConfig::default()))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("finsage").join("config").join("models.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&PathBuf>) -> Result<RouterConfig> {
    let path = override_path.cloned().or_else(default_config_path);

    let content = match path {
        Some(path) if path.exists() => fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    defaults: Option<RawDefaults>,
    tasks: Option<HashMap<String, RawTaskConfig>>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawTaskConfig {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<RouterConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = RouterConfig::default();

    if let Some(defaults) = raw.defaults {
        if let Some(timeout) = defaults.timeout_secs {
            config.default_timeout = Duration::from_secs(timeout);
        }
    }

    if let Some(tasks) = raw.tasks {
        for (task_name, task_config) in tasks {
            let Ok(task) = task_name.parse::<TaskType>() else {
                tracing::warn!(task = %task_name, "Skipping unknown task in model config");
                continue;
            };

            let defaults = TaskConfig::defaults_for(task);
            config.tasks.insert(
                task,
                TaskConfig {
                    model: task_config.model.filter(|m| !m.trim().is_empty()),
                    temperature: task_config.temperature.unwrap_or(defaults.temperature),
                    max_tokens: task_config.max_tokens.unwrap_or(defaults.max_tokens),
                    timeout: task_config
                        .timeout_secs
                        .map(Duration::from_secs)
                        .unwrap_or(config.default_timeout),
                },
            );
        }
    }

    Ok(config)
}
