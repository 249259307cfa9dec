//! Render engine requests into chat prompts

use std::collections::HashMap;

use serde::Serialize;

use crate::error::AIError;
use crate::models::{AdviceRequest, AnomalyRequest, BudgetRequest, Category, RecommendationRequest};
use crate::prompts::PromptId;
use crate::recommend::{month_over_month_changes, overruns};

use super::types::{ChatPrompt, SharedPrompts};

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, AIError> {
    serde_json::to_string_pretty(value).map_err(|e| AIError::Prompt(e.to_string()))
}

/// Pretty JSON, or "None" for an empty list
fn json_or_none<T: Serialize>(items: &[T]) -> Result<String, AIError> {
    if items.is_empty() {
        Ok("None".to_string())
    } else {
        pretty_json(items)
    }
}

fn render(
    prompts: &SharedPrompts,
    id: PromptId,
    vars: &HashMap<&str, String>,
) -> Result<ChatPrompt, AIError> {
    let mut library = prompts
        .write()
        .map_err(|_| AIError::Prompt("Failed to acquire prompt library lock".into()))?;
    let prompt = library
        .get(id)
        .map_err(|e| AIError::Prompt(e.to_string()))?;

    Ok(ChatPrompt {
        system: prompt.render_system(vars),
        user: prompt.render_user(vars),
    })
}

pub fn budget_prompt(
    prompts: &SharedPrompts,
    request: &BudgetRequest,
) -> Result<ChatPrompt, AIError> {
    let categories = Category::all()
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let past_expenses = match request.past_expenses {
        Some(ref past) if !past.is_empty() => pretty_json(past)?,
        _ => String::new(),
    };

    let mut vars = HashMap::new();
    vars.insert("income", money(request.income));
    vars.insert("target_savings", money(request.target_savings));
    vars.insert("loan_commitments", money(request.loan_commitments));
    vars.insert("spendable", money(request.spendable()));
    vars.insert("past_expenses", past_expenses);
    vars.insert("categories", categories);

    render(prompts, PromptId::BudgetPlan, &vars)
}

pub fn anomaly_prompt(
    prompts: &SharedPrompts,
    request: &AnomalyRequest,
) -> Result<ChatPrompt, AIError> {
    let mut vars = HashMap::new();
    vars.insert("income", money(request.income));
    vars.insert("monthly_limit", money(request.monthly_limit));
    vars.insert("target_savings", money(request.target_savings));
    vars.insert("current_expenses", pretty_json(&request.current_expenses)?);
    vars.insert("budget_allocations", pretty_json(&request.budget_allocations)?);
    vars.insert("last_month_expenses", pretty_json(&request.last_month_expenses)?);

    render(prompts, PromptId::DetectAnomalies, &vars)
}

/// Overruns and month-over-month spikes are computed locally and handed to
/// the model as context
pub fn recommendation_prompt(
    prompts: &SharedPrompts,
    request: &RecommendationRequest,
) -> Result<ChatPrompt, AIError> {
    let mut vars = HashMap::new();
    vars.insert("income", money(request.income));
    vars.insert("total_expenses", money(request.total_expenses));
    vars.insert("overruns", json_or_none(&overruns(request))?);
    vars.insert("changes", json_or_none(&month_over_month_changes(request))?);
    vars.insert(
        "current_expenses",
        pretty_json(&request.current_month_expenses)?,
    );

    render(prompts, PromptId::Recommendations, &vars)
}

pub fn advice_prompt(
    prompts: &SharedPrompts,
    request: &AdviceRequest,
) -> Result<ChatPrompt, AIError> {
    let mut vars = HashMap::new();
    vars.insert("income", money(request.income));
    vars.insert("total_expenses", money(request.total_expenses));
    vars.insert("savings", money(request.savings));
    vars.insert("target_savings", money(request.target_savings));
    vars.insert("anomaly_count", request.anomaly_count.to_string());

    render(prompts, PromptId::FinancialAdvice, &vars)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, RwLock};

    use super::*;
    use crate::models::CategoryAmounts;
    use crate::prompts::PromptLibrary;

    fn library() -> SharedPrompts {
        Arc::new(RwLock::new(PromptLibrary::embedded_only()))
    }

    #[test]
    fn test_budget_prompt_embeds_numbers() {
        let mut past = CategoryAmounts::new();
        past.insert("Food".into(), 4200.0);
        let request = BudgetRequest::new(50000.0, 10000.0)
            .with_loans(2500.0)
            .with_past_expenses(past);

        let prompt = budget_prompt(&library(), &request).unwrap();
        assert!(prompt.system.as_deref().unwrap().contains("JSON"));
        assert!(prompt.user.contains("₹37500.00"));
        assert!(prompt.user.contains("₹2500.00"));
        assert!(prompt.user.contains("\"Food\": 4200.0"));
        assert!(prompt.user.contains("Rent, Food, Bills"));
        assert!(!prompt.user.contains("{{"));
    }

    #[test]
    fn test_recommendation_prompt_lists_overruns() {
        let mut current = CategoryAmounts::new();
        current.insert("Food".into(), 6000.0);
        let mut budget = CategoryAmounts::new();
        budget.insert("Food".into(), 5000.0);
        let request = RecommendationRequest {
            income: 50000.0,
            current_month_expenses: current,
            budget_allocations: budget,
            total_expenses: 6000.0,
            ..Default::default()
        };

        let prompt = recommendation_prompt(&library(), &request).unwrap();
        assert!(prompt.user.contains("\"exceeded_by\": 1000.0"));
        // No previous month, so no spikes
        assert!(prompt.user.contains("None"));
    }

    #[test]
    fn test_all_prompts_render_without_placeholders() {
        let prompts = library();
        let anomaly = anomaly_prompt(&prompts, &AnomalyRequest::default()).unwrap();
        let advice = advice_prompt(
            &prompts,
            &AdviceRequest {
                anomaly_count: 3,
                ..Default::default()
            },
        )
        .unwrap();

        for prompt in [anomaly, advice] {
            assert!(!prompt.user.contains("{{"), "{}", prompt.user);
            assert_eq!(prompt.messages().len(), 2);
        }
    }
}
