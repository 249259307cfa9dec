//! Budget, anomaly, recommendation and advice handlers
//!
//! Every response carries the result under `data` plus where it came from:
//! `source` is `model`, `rule_based` or `fallback`, with the model name or
//! the failure kind alongside.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use finsage_core::normalize::round_currency;
use finsage_core::{
    AdviceRequest, Anomaly, AnomalyRequest, BudgetRequest, CategoryAllocation, Generated,
    Recommendation, RecommendationRequest,
};

use crate::{AppError, AppState};

/// Engine result with provenance
#[derive(Debug, Serialize)]
pub struct EngineResponse<T> {
    pub data: T,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<&'static str>,
    /// Pool the budget was allocated from (budget only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spendable: Option<f64>,
}

impl<T> From<Generated<T>> for EngineResponse<T> {
    fn from(generated: Generated<T>) -> Self {
        Self {
            source: generated.source.as_str(),
            model: generated.source.model().map(str::to_string),
            fallback_reason: generated.source.fallback_reason().map(|r| r.kind()),
            spendable: None,
            data: generated.value,
        }
    }
}

/// POST /api/budget - Allocate spendable income across categories
pub async fn generate_budget(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BudgetRequest>,
) -> Result<Json<EngineResponse<Vec<CategoryAllocation>>>, AppError> {
    let plan = state
        .engine
        .generate_budget_plan(&request)
        .await
        .map_err(AppError::from_engine)?;

    let mut response: EngineResponse<_> = plan.into();
    response.spendable = Some(round_currency(request.spendable()));
    Ok(Json(response))
}

/// POST /api/anomalies - Flag overspending, spikes and limit breaches
pub async fn detect_anomalies(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnomalyRequest>,
) -> Result<Json<EngineResponse<Vec<Anomaly>>>, AppError> {
    let anomalies = state
        .engine
        .detect_anomalies(&request)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(anomalies.into()))
}

/// POST /api/recommendations - Actionable tips (never empty)
pub async fn generate_recommendations(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<EngineResponse<Vec<Recommendation>>>, AppError> {
    let recommendations = state
        .engine
        .generate_recommendations(&request)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(recommendations.into()))
}

/// POST /api/advice - Free-text financial advice
pub async fn financial_advice(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdviceRequest>,
) -> Result<Json<EngineResponse<String>>, AppError> {
    let advice = state
        .engine
        .financial_advice(&request)
        .await
        .map_err(AppError::from_engine)?;

    Ok(Json(advice.into()))
}
