//! Shared helpers for the ledger-driven commands
//!
//! - `load_snapshot` - Read a ledger CSV and summarize one month
//! - `Output` - Text or JSON printing
//! - `money` / `source_label` - Display formatting

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use finsage_core::ledger::{latest_month, read_transactions_csv, Month, MonthlySnapshot, Transaction};
use finsage_core::{CategoryAmounts, Generated, Source, CURRENCY};

use crate::cli::LedgerArgs;

/// Where command results go
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Read every transaction from a ledger CSV
pub fn load_ledger(path: &Path) -> Result<Vec<Transaction>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open ledger {}", path.display()))?;
    read_transactions_csv(file).with_context(|| format!("Failed to parse ledger {}", path.display()))
}

/// The requested month, else the newest in the ledger, else the current month
pub fn resolve_month(transactions: &[Transaction], month: Option<Month>) -> Month {
    month
        .or_else(|| latest_month(transactions))
        .unwrap_or_else(|| Month::of(Local::now().date_naive()))
}

pub fn load_snapshot(args: &LedgerArgs) -> Result<MonthlySnapshot> {
    let transactions = load_ledger(&args.file)?;
    let month = resolve_month(&transactions, args.month);
    tracing::debug!(
        "Summarizing {} transactions for {}",
        transactions.len(),
        month
    );
    Ok(MonthlySnapshot::compute(&transactions, month))
}

/// Collect `--budget Category=amount` pairs; later duplicates win
pub fn to_amounts(pairs: Vec<(String, f64)>) -> CategoryAmounts {
    pairs.into_iter().collect()
}

pub fn money(amount: f64) -> String {
    if amount < 0.0 {
        format!("-{}{:.2}", CURRENCY, amount.abs())
    } else {
        format!("{}{:.2}", CURRENCY, amount)
    }
}

pub fn source_label(source: &Source) -> String {
    match source {
        Source::Model { model } => format!("model {}", model),
        Source::RuleBased => "rules".to_string(),
        Source::Fallback { reason } => format!("rules, AI fallback: {}", reason.kind()),
    }
}

/// JSON shape shared by the engine commands
pub fn report_json<T: Serialize>(generated: &Generated<T>) -> serde_json::Value {
    serde_json::json!({
        "data": generated.value,
        "source": generated.source.as_str(),
        "model": generated.source.model(),
        "fallback_reason": generated.source.fallback_reason().map(|r| r.kind()),
    })
}
