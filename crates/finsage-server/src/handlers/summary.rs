//! Ledger summary handler

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Local;
use serde::Deserialize;

use finsage_core::ledger::{latest_month, Month, MonthlySnapshot, Transaction};

use crate::{AppError, AppState};

/// Maximum transactions accepted in one summary request
pub const MAX_SUMMARY_TRANSACTIONS: usize = 50_000;

/// Request body for a monthly summary
#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub transactions: Vec<Transaction>,
    /// Month to summarize ("YYYY-MM"); defaults to the newest transaction's month
    pub month: Option<Month>,
}

/// POST /api/summary - Income, spend and per-category totals for a month
pub async fn monthly_summary(
    State(_state): State<Arc<AppState>>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<MonthlySnapshot>, AppError> {
    if request.transactions.len() > MAX_SUMMARY_TRANSACTIONS {
        return Err(AppError::bad_request(&format!(
            "Too many transactions (max {})",
            MAX_SUMMARY_TRANSACTIONS
        )));
    }
    if let Some(tx) = request
        .transactions
        .iter()
        .find(|tx| !tx.amount.is_finite() || tx.amount < 0.0)
    {
        return Err(AppError::bad_request(&format!(
            "Transaction on {} has an invalid amount",
            tx.date
        )));
    }

    let month = request
        .month
        .or_else(|| latest_month(&request.transactions))
        .unwrap_or_else(|| Month::of(Local::now().date_naive()));

    Ok(Json(MonthlySnapshot::compute(&request.transactions, month)))
}
