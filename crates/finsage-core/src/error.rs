//! Error types for FinSage

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("AI error: {0}")]
    Ai(#[from] AIError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why the external-model path did not produce a result.
///
/// Every variant leads to the same deterministic fallback. The variant is kept
/// so callers can log or count failures by kind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AIError {
    /// Connection refused, DNS failure, non-success HTTP status, auth rejection
    #[error("network failure: {0}")]
    Network(String),

    /// No reply within the configured per-task timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Reply was not parseable JSON (or was empty when text was expected)
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Reply parsed but did not match the expected record shape
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Local prompt template could not be loaded or rendered
    #[error("prompt unavailable: {0}")]
    Prompt(String),
}

impl AIError {
    /// Short machine-readable label (for metrics and API responses)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::MalformedResponse(_) => "malformed_response",
            Self::SchemaMismatch(_) => "schema_mismatch",
            Self::Prompt(_) => "prompt",
        }
    }

    /// Map a transport error, separating timeouts from other network failures
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
