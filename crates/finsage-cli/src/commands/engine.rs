//! Engine command implementations
//!
//! Each command builds an engine request from flags or a ledger month, runs
//! it, then prints either a short table or the JSON report.

use std::path::Path;

use anyhow::Result;

use finsage_core::ledger::MonthlySnapshot;
use finsage_core::normalize::round_currency;
use finsage_core::{
    AdviceRequest, AnomalyRequest, BudgetRequest, FinanceEngine, Month, RecommendationRequest,
    RecommendationType,
};

use super::ledger::{
    load_ledger, load_snapshot, money, report_json, resolve_month, source_label, to_amounts,
    Output,
};
use crate::cli::LedgerArgs;

pub fn budget_request(
    income: f64,
    savings: f64,
    loans: f64,
    history: Option<&MonthlySnapshot>,
) -> BudgetRequest {
    let request = BudgetRequest::new(income, savings).with_loans(loans);
    match history {
        Some(snapshot) if !snapshot.current_expenses.is_empty() => {
            request.with_past_expenses(snapshot.current_expenses.clone())
        }
        _ => request,
    }
}

pub fn anomaly_request(
    snapshot: &MonthlySnapshot,
    limit: f64,
    savings: f64,
    budgets: Vec<(String, f64)>,
) -> AnomalyRequest {
    AnomalyRequest {
        income: snapshot.total_income,
        monthly_limit: limit,
        target_savings: savings,
        current_expenses: snapshot.current_expenses.clone(),
        budget_allocations: to_amounts(budgets),
        last_month_expenses: snapshot.last_month_expenses.clone(),
    }
}

pub fn recommendation_request(
    snapshot: &MonthlySnapshot,
    budgets: Vec<(String, f64)>,
) -> RecommendationRequest {
    RecommendationRequest {
        income: snapshot.total_income,
        current_month_expenses: snapshot.current_expenses.clone(),
        last_month_expenses: snapshot.last_month_expenses.clone(),
        budget_allocations: to_amounts(budgets),
        total_expenses: snapshot.total_expenses,
    }
}

pub async fn cmd_budget(
    engine: &FinanceEngine,
    out: &Output,
    income: f64,
    savings: f64,
    loans: f64,
    history: Option<&Path>,
    month: Option<Month>,
) -> Result<()> {
    let snapshot = match history {
        Some(path) => {
            let transactions = load_ledger(path)?;
            let month = resolve_month(&transactions, month);
            Some(MonthlySnapshot::compute(&transactions, month))
        }
        None => None,
    };

    let request = budget_request(income, savings, loans, snapshot.as_ref());
    let spendable = round_currency(request.spendable());
    let plan = engine.generate_budget_plan(&request).await?;

    if out.is_json() {
        let mut report = report_json(&plan);
        report["spendable"] = serde_json::json!(spendable);
        return out.print_json(&report);
    }

    if plan.value.is_empty() {
        println!(
            "⚠️  Nothing to allocate: savings and loans leave {} spendable",
            money(spendable)
        );
        return Ok(());
    }

    println!(
        "💰 Budget plan for {} spendable ({})\n",
        money(spendable),
        source_label(&plan.source)
    );
    println!("{:<15} {:>14} {:>7}", "CATEGORY", "AMOUNT", "SHARE");
    println!("{}", "-".repeat(38));
    for allocation in &plan.value {
        println!(
            "{:<15} {:>14} {:>6.1}%",
            allocation.category.as_str(),
            money(allocation.allocated_amount),
            allocation.allocated_amount / spendable * 100.0
        );
    }

    Ok(())
}

pub async fn cmd_detect(
    engine: &FinanceEngine,
    out: &Output,
    ledger: &LedgerArgs,
    limit: f64,
    savings: f64,
    budgets: Vec<(String, f64)>,
) -> Result<()> {
    let snapshot = load_snapshot(ledger)?;
    let request = anomaly_request(&snapshot, limit, savings, budgets);
    let anomalies = engine.detect_anomalies(&request).await?;

    if out.is_json() {
        return out.print_json(&report_json(&anomalies));
    }

    println!(
        "🔍 Spending anomalies for {} ({})\n",
        snapshot.month,
        source_label(&anomalies.source)
    );
    if anomalies.value.is_empty() {
        println!("✅ Nothing unusual found");
        return Ok(());
    }

    for anomaly in &anomalies.value {
        println!(
            "  • {}: {} (impact {})",
            anomaly.category,
            anomaly.issue,
            money(anomaly.impact_amount)
        );
        println!("    → {}", anomaly.recommendation);
    }

    Ok(())
}

pub async fn cmd_recommend(
    engine: &FinanceEngine,
    out: &Output,
    ledger: &LedgerArgs,
    budgets: Vec<(String, f64)>,
) -> Result<()> {
    let snapshot = load_snapshot(ledger)?;
    let request = recommendation_request(&snapshot, budgets);
    let recommendations = engine.generate_recommendations(&request).await?;

    if out.is_json() {
        return out.print_json(&report_json(&recommendations));
    }

    println!(
        "💡 Recommendations for {} ({})\n",
        snapshot.month,
        source_label(&recommendations.source)
    );
    for rec in &recommendations.value {
        let icon = match rec.kind {
            RecommendationType::Warning => "⚠️ ",
            RecommendationType::Success => "✅",
            RecommendationType::Info => "ℹ️ ",
        };
        println!("  {} {}: {}", icon, rec.category, rec.message);
    }

    Ok(())
}

pub async fn cmd_advise(
    engine: &FinanceEngine,
    out: &Output,
    ledger: &LedgerArgs,
    savings: f64,
    limit: Option<f64>,
) -> Result<()> {
    let snapshot = load_snapshot(ledger)?;

    let anomaly_count = match limit {
        Some(limit) => {
            let request = anomaly_request(&snapshot, limit, savings, Vec::new());
            let found = engine.detect_anomalies(&request).await?;
            u32::try_from(found.value.len()).unwrap_or(u32::MAX)
        }
        None => 0,
    };

    let request = AdviceRequest {
        income: snapshot.total_income,
        total_expenses: snapshot.total_expenses,
        savings: snapshot.savings,
        target_savings: savings,
        anomaly_count,
    };
    let advice = engine.financial_advice(&request).await?;

    if out.is_json() {
        return out.print_json(&report_json(&advice));
    }

    println!(
        "📝 Advice for {} ({})\n",
        snapshot.month,
        source_label(&advice.source)
    );
    println!("{}", advice.value);

    Ok(())
}

pub fn cmd_summary(out: &Output, ledger: &LedgerArgs) -> Result<()> {
    let snapshot = load_snapshot(ledger)?;

    if out.is_json() {
        return out.print_json(&snapshot);
    }

    println!("📊 Summary for {}\n", snapshot.month);
    println!("  Income:     {:>14}", money(snapshot.total_income));
    println!("  Expenses:   {:>14}", money(snapshot.total_expenses));
    println!("  Savings:    {:>14}", money(snapshot.savings));
    println!(
        "  Last month: {:>14}",
        money(snapshot.last_month_total_expenses)
    );

    if !snapshot.current_expenses.is_empty() {
        println!();
        println!("{:<15} {:>14} {:>14}", "CATEGORY", "THIS MONTH", "LAST MONTH");
        println!("{}", "-".repeat(45));
        for (category, amount) in &snapshot.current_expenses {
            let last = snapshot
                .last_month_expenses
                .get(category)
                .copied()
                .unwrap_or(0.0);
            println!("{:<15} {:>14} {:>14}", category, money(*amount), money(last));
        }
    }

    Ok(())
}
