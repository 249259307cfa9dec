//! Rule-based budget allocation
//!
//! Splits the spendable amount (income minus savings target minus loan
//! commitments) across the fixed category table. Each category gets its
//! historical share clamped into the category's `[min, max]` range, or the
//! midpoint of that range when there is no history. The result is then
//! scaled down if the shares add up to more than 100%.

use tracing::{debug, info};

use crate::models::{BudgetRequest, Category, CategoryAllocation, CategoryAmounts};
use crate::normalize::{allocation_total, cap_to_spendable, round_currency};

/// Share of the spendable amount assigned to one category
fn category_share(category: Category, request: &BudgetRequest, spendable: f64) -> f64 {
    let (min, max) = category.share_range();
    let past = request
        .past_expenses
        .as_ref()
        .and_then(|past| past_amount(past, category));

    match past {
        Some(amount) => (amount / spendable).clamp(min, max),
        None => category.default_share(),
    }
}

/// History for one category, matching names case-insensitively.
///
/// Keys that differ only in case (`Food`, `food`) are added together.
fn past_amount(past: &CategoryAmounts, category: Category) -> Option<f64> {
    past.iter()
        .filter(|(name, _)| name.parse::<Category>().ok() == Some(category))
        .map(|(_, amount)| *amount)
        .reduce(|total, amount| total + amount)
}

/// Per-category amounts before the sum constraint is applied.
///
/// Returns an empty list when nothing is left to allocate.
pub fn propose_allocations(request: &BudgetRequest) -> Vec<CategoryAllocation> {
    let spendable = request.spendable();
    if spendable <= 0.0 {
        return Vec::new();
    }

    Category::all()
        .iter()
        .map(|&category| {
            let share = category_share(category, request, spendable);
            CategoryAllocation {
                category,
                allocated_amount: round_currency(spendable * share),
            }
        })
        .collect()
}

/// Deterministic allocation: proposals capped to the spendable amount.
///
/// An empty result means the savings target and loans consume all income.
pub fn allocate(request: &BudgetRequest) -> Vec<CategoryAllocation> {
    let spendable = request.spendable();
    if spendable <= 0.0 {
        debug!(
            spendable,
            income = request.income,
            target_savings = request.target_savings,
            loan_commitments = request.loan_commitments,
            "Nothing left to allocate"
        );
        return Vec::new();
    }

    let mut allocations = propose_allocations(request);
    cap_to_spendable(&mut allocations, spendable);

    info!(
        total = allocation_total(&allocations),
        spendable, "Rule-based budget allocated"
    );
    allocations
}
