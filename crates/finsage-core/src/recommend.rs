//! Rule-based recommendations and advice text

use serde::Serialize;
use tracing::info;

use crate::models::{AdviceRequest, Recommendation, RecommendationRequest, RecommendationType, CURRENCY};
use crate::normalize::round_currency;

/// Month-over-month increase (percent) that earns a spike recommendation
pub const RECOMMENDATION_SPIKE_PCT: f64 = 20.0;

/// Share of income above which expenses are flagged in advice text
pub const HIGH_EXPENSE_RATIO: f64 = 0.8;

const CATEGORY_TIPS: &[(&str, &str)] = &[
    (
        "Entertainment",
        "Switch to free streaming (YouTube, MX Player). Play offline games or visit free public parks.",
    ),
    (
        "Food",
        "Meal prep on Sundays to avoid ordering food. Cook at home 5 days a week.",
    ),
    (
        "Shopping",
        "Use a 48-hour rule before buying anything above ₹500. Uninstall shopping apps temporarily.",
    ),
    (
        "Transport",
        "Use public transport or carpool 3 days a week. Combine errands into single trips.",
    ),
    (
        "Bills",
        "Switch off appliances at the plug. Use fans instead of AC for a few hours daily.",
    ),
    (
        "Healthcare",
        "Use generic medicines and government hospitals for routine checkups.",
    ),
    (
        "Education",
        "Use free resources like YouTube, Coursera free tier, or library books.",
    ),
    (
        "Rent",
        "Consider splitting rent with a flatmate or negotiating with your landlord.",
    ),
    (
        "Other",
        "Review miscellaneous expenses and categorise them to identify where to cut.",
    ),
];

/// Canned saving tip for a category, if one exists
pub fn category_tip(category: &str) -> Option<&'static str> {
    CATEGORY_TIPS
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, tip)| *tip)
}

/// A category whose spend went past its allocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overrun {
    pub category: String,
    pub allocated: f64,
    pub spent: f64,
    pub exceeded_by: f64,
}

/// A category whose spend rose sharply against last month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthOverMonthChange {
    pub category: String,
    pub increase_pct: f64,
}

/// Categories spent past a positive allocation
pub fn overruns(request: &RecommendationRequest) -> Vec<Overrun> {
    request
        .current_month_expenses
        .iter()
        .filter_map(|(category, &spent)| {
            let allocated = request.budget_allocations.get(category).copied().unwrap_or(0.0);
            (allocated > 0.0 && spent > allocated).then(|| Overrun {
                category: category.clone(),
                allocated: round_currency(allocated),
                spent: round_currency(spent),
                exceeded_by: round_currency(spent - allocated),
            })
        })
        .collect()
}

/// Categories more than 20% above last month
pub fn month_over_month_changes(request: &RecommendationRequest) -> Vec<MonthOverMonthChange> {
    request
        .current_month_expenses
        .iter()
        .filter_map(|(category, &spent)| {
            let last = request.last_month_expenses.get(category).copied().unwrap_or(0.0);
            if last <= 0.0 {
                return None;
            }
            let change_pct = (spent - last) / last * 100.0;
            (change_pct > RECOMMENDATION_SPIKE_PCT).then(|| MonthOverMonthChange {
                category: category.clone(),
                increase_pct: (change_pct * 10.0).round() / 10.0,
            })
        })
        .collect()
}

/// Build recommendations from overruns, spikes and the month's total.
///
/// Always returns at least one recommendation.
pub fn recommend(request: &RecommendationRequest) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    for overrun in overruns(request) {
        let cat = &overrun.category;
        let tip = category_tip(cat).map(str::to_string).unwrap_or_else(|| {
            format!("Review your {} spending and identify non-essential items to cut.", cat)
        });
        recs.push(Recommendation {
            category: format!("{} Budget Alert", cat),
            message: format!(
                "You exceeded your {} budget by {}{:.2}. {}",
                cat, CURRENCY, overrun.exceeded_by, tip
            ),
            kind: RecommendationType::Warning,
        });
    }

    for change in month_over_month_changes(request) {
        let cat = &change.category;
        let tip = category_tip(cat)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Your {} spending rose sharply.", cat));
        recs.push(Recommendation {
            category: format!("{} Spike", cat),
            message: format!(
                "{} spending increased {:.1}% vs last month. {}",
                cat, change.increase_pct, tip
            ),
            kind: RecommendationType::Warning,
        });
    }

    if request.total_expenses > 0.0 {
        let monthly = round_currency(request.total_expenses * 0.1);
        recs.push(Recommendation {
            category: "Savings Opportunity".to_string(),
            message: format!(
                "Reducing expenses by 10% saves {}{:.2}/month, or {}{:.2} annually. Set up an auto-transfer to savings on salary day.",
                CURRENCY,
                monthly,
                CURRENCY,
                round_currency(monthly * 12.0)
            ),
            kind: RecommendationType::Success,
        });
    }

    if recs.is_empty() {
        recs.push(Recommendation {
            category: "Financial Health".to_string(),
            message: "Your spending looks on track. Keep monitoring category budgets to maintain this."
                .to_string(),
            kind: RecommendationType::Success,
        });
    }

    info!(count = recs.len(), "Rule-based recommendations generated");
    recs
}

/// Numbered plain-text advice assembled from fixed rules
pub fn advise(request: &AdviceRequest) -> String {
    let mut lines = Vec::new();

    let gap = request.savings - request.target_savings;
    if gap < 0.0 {
        lines.push(format!(
            "You are {}{:.2} short of your savings target of {}{:.2}. Cut discretionary spending such as shopping and entertainment first.",
            CURRENCY,
            -gap,
            CURRENCY,
            request.target_savings
        ));
    } else {
        lines.push(format!(
            "You met your savings target with {}{:.2} to spare. Consider moving the surplus into a recurring deposit or index fund.",
            CURRENCY, gap
        ));
    }

    if request.income > 0.0 {
        let ratio = request.total_expenses / request.income;
        if ratio > HIGH_EXPENSE_RATIO {
            lines.push(format!(
                "Expenses are {:.1}% of your income. Aim to keep them below {:.0}%.",
                ratio * 100.0,
                HIGH_EXPENSE_RATIO * 100.0
            ));
        }
    }

    if request.anomaly_count > 0 {
        let noun = if request.anomaly_count == 1 { "anomaly" } else { "anomalies" };
        lines.push(format!(
            "Review the {} spending {} flagged this month and decide which expenses can be avoided.",
            request.anomaly_count, noun
        ));
    }

    lines.push(
        "Set up an automatic transfer to savings on salary day so saving happens before spending."
            .to_string(),
    );

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}. {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}
