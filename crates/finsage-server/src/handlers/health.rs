//! Health and AI backend status handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use finsage_core::AIBackend;

use crate::AppState;

/// GET /api/health - Liveness probe (no auth)
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "FinSage API",
        "ai_backend": state.engine.ai().map(|ai| ai.host()),
    }))
}

/// AI backend status
#[derive(Debug, Serialize)]
pub struct AiStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Task-specific model overrides
    pub task_models: Vec<(String, String)>,
    pub healthy: bool,
}

/// GET /api/ai - Which backend is configured and whether it responds
pub async fn ai_status(State(state): State<Arc<AppState>>) -> Json<AiStatus> {
    let Some(ai) = state.engine.ai() else {
        return Json(AiStatus {
            configured: false,
            backend: None,
            host: None,
            default_model: None,
            task_models: vec![],
            healthy: false,
        });
    };

    let router_info = ai.router_info();
    Json(AiStatus {
        configured: true,
        backend: Some(ai.kind()),
        host: Some(ai.host().to_string()),
        default_model: Some(router_info.default_model),
        task_models: router_info.task_models,
        healthy: ai.health_check().await,
    })
}
