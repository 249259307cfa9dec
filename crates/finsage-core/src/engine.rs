//! Finance engine - model first, rules always
//!
//! Each operation tries the configured AI backend once and falls back to the
//! deterministic implementation on any failure. Callers always get a value;
//! [`Source`] records which path produced it.
//!
//! ```rust,ignore
//! let engine = FinanceEngine::from_env();
//! let plan = engine.generate_budget_plan(&request).await?;
//! if let Some(reason) = plan.source.fallback_reason() {
//!     metrics.count(reason.kind());
//! }
//! ```

use tracing::{info, warn};

use crate::ai::{AIBackend, AIClient, AIResult};
use crate::anomaly;
use crate::budget;
use crate::error::{AIError, Result};
use crate::model_router::TaskType;
use crate::models::{
    AdviceRequest, Anomaly, AnomalyRequest, BudgetRequest, CategoryAllocation, Recommendation,
    RecommendationRequest,
};
use crate::recommend;

/// Which path produced a result
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// The AI backend's validated reply
    Model { model: String },
    /// No AI backend configured
    RuleBased,
    /// The AI backend failed; rules were used instead
    Fallback { reason: AIError },
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model { .. } => "model",
            Self::RuleBased => "rule_based",
            Self::Fallback { .. } => "fallback",
        }
    }

    pub fn model(&self) -> Option<&str> {
        match self {
            Self::Model { model } => Some(model),
            _ => None,
        }
    }

    pub fn fallback_reason(&self) -> Option<&AIError> {
        match self {
            Self::Fallback { reason } => Some(reason),
            _ => None,
        }
    }
}

/// A result together with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Generated<T> {
    fn rule_based(value: T) -> Self {
        Self {
            value,
            source: Source::RuleBased,
        }
    }
}

/// Budget, anomaly, recommendation and advice generation
#[derive(Clone, Default)]
pub struct FinanceEngine {
    ai: Option<AIClient>,
}

impl FinanceEngine {
    pub fn new(ai: Option<AIClient>) -> Self {
        Self { ai }
    }

    /// Deterministic rules only
    pub fn offline() -> Self {
        Self { ai: None }
    }

    /// Use whichever backend the environment configures, if any
    pub fn from_env() -> Self {
        Self::new(AIClient::from_env())
    }

    pub fn ai(&self) -> Option<&AIClient> {
        self.ai.as_ref()
    }

    /// Category allocations that never exceed the spendable amount.
    ///
    /// A non-positive spendable amount yields an empty plan without calling
    /// the model.
    pub async fn generate_budget_plan(
        &self,
        request: &BudgetRequest,
    ) -> Result<Generated<Vec<CategoryAllocation>>> {
        request.validate()?;

        if request.spendable() <= 0.0 {
            info!(
                spendable = request.spendable(),
                "Nothing to allocate, savings and loans exceed income"
            );
            return Ok(Generated::rule_based(Vec::new()));
        }

        let outcome = match self.ai {
            Some(ref ai) => Some(ai.generate_budget_plan(request).await),
            None => None,
        };
        Ok(self.settle(TaskType::BudgetPlan, outcome, || {
            budget::allocate(request)
        }))
    }

    pub async fn detect_anomalies(
        &self,
        request: &AnomalyRequest,
    ) -> Result<Generated<Vec<Anomaly>>> {
        request.validate()?;

        let outcome = match self.ai {
            Some(ref ai) => Some(ai.detect_anomalies(request).await),
            None => None,
        };
        Ok(self.settle(TaskType::AnomalyDetection, outcome, || {
            anomaly::detect(request)
        }))
    }

    /// Never empty
    pub async fn generate_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Result<Generated<Vec<Recommendation>>> {
        request.validate()?;

        let outcome = match self.ai {
            Some(ref ai) => Some(ai.generate_recommendations(request).await),
            None => None,
        };
        Ok(self.settle(TaskType::Recommendations, outcome, || {
            recommend::recommend(request)
        }))
    }

    pub async fn financial_advice(&self, request: &AdviceRequest) -> Result<Generated<String>> {
        request.validate()?;

        let outcome = match self.ai {
            Some(ref ai) => Some(ai.financial_advice(request).await),
            None => None,
        };
        Ok(self.settle(TaskType::FinancialAdvice, outcome, || {
            recommend::advise(request)
        }))
    }

    /// Keep a model result or run the rules
    fn settle<T>(
        &self,
        task: TaskType,
        outcome: Option<AIResult<T>>,
        rules: impl FnOnce() -> T,
    ) -> Generated<T> {
        let Some(ai) = self.ai.as_ref() else {
            return Generated::rule_based(rules());
        };
        let model = ai.model_for_task(task);

        match outcome {
            Some(Ok(value)) => {
                info!(task = task.as_str(), model = %model, "Model result accepted");
                Generated {
                    value,
                    source: Source::Model { model },
                }
            }
            Some(Err(reason)) => {
                warn!(
                    task = task.as_str(),
                    model = %model,
                    kind = reason.kind(),
                    error = %reason,
                    "Model path failed, using rules"
                );
                Generated {
                    value: rules(),
                    source: Source::Fallback { reason },
                }
            }
            None => Generated::rule_based(rules()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ai::MockBackend;
    use crate::models::{Category, CategoryAmounts};
    use crate::normalize::allocation_total;

    fn amounts(pairs: &[(&str, f64)]) -> CategoryAmounts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn engine_with(mock: MockBackend) -> FinanceEngine {
        FinanceEngine::new(Some(AIClient::Mock(mock)))
    }

    #[tokio::test]
    async fn test_offline_budget_is_rule_based() {
        let request = BudgetRequest::new(50000.0, 10000.0);
        let plan = FinanceEngine::offline()
            .generate_budget_plan(&request)
            .await
            .unwrap();

        assert_eq!(plan.source, Source::RuleBased);
        assert_eq!(plan.value, budget::allocate(&request));
        assert_eq!(plan.value.len(), Category::all().len());
    }

    #[tokio::test]
    async fn test_model_budget_is_reconciled() {
        let request = BudgetRequest::new(50000.0, 10000.0);
        let plan = engine_with(MockBackend::new())
            .generate_budget_plan(&request)
            .await
            .unwrap();

        assert_eq!(plan.source.model(), Some("mock"));
        assert_eq!(plan.value.len(), Category::all().len());
        assert!(plan.value.iter().all(|a| a.allocated_amount > 0.0));
        assert!(allocation_total(&plan.value) <= 40000.0 + 0.01);
    }

    #[tokio::test]
    async fn test_partial_model_budget_falls_back() {
        let mock = MockBackend::new().with_reply(
            TaskType::BudgetPlan,
            r#"[{"category": "Rent", "allocated_amount": 40000}]"#,
        );
        let request = BudgetRequest::new(50000.0, 10000.0);
        let plan = engine_with(mock)
            .generate_budget_plan(&request)
            .await
            .unwrap();

        assert_eq!(
            plan.source.fallback_reason().map(AIError::kind),
            Some("schema_mismatch")
        );
        assert_eq!(plan.value, budget::allocate(&request));
        assert_eq!(plan.value.len(), Category::all().len());
        assert!(plan.value.iter().all(|a| a.allocated_amount > 0.0));
    }

    #[tokio::test]
    async fn test_degenerate_budget_skips_model() {
        let mock = MockBackend::new();
        let engine = engine_with(mock.clone());

        let request = BudgetRequest::new(30000.0, 25000.0).with_loans(5000.0);
        let plan = engine.generate_budget_plan(&request).await.unwrap();

        assert!(plan.value.is_empty());
        assert_eq!(plan.source, Source::RuleBased);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_rules() {
        let mock = MockBackend::new().failing(
            TaskType::AnomalyDetection,
            AIError::Timeout(Duration::from_secs(30)),
        );
        let request = AnomalyRequest {
            income: 50000.0,
            monthly_limit: 10000.0,
            current_expenses: amounts(&[("Food", 6000.0)]),
            budget_allocations: amounts(&[("Food", 5000.0)]),
            ..Default::default()
        };

        let result = engine_with(mock).detect_anomalies(&request).await.unwrap();
        assert_eq!(
            result.source.fallback_reason(),
            Some(&AIError::Timeout(Duration::from_secs(30)))
        );
        assert_eq!(result.value, anomaly::detect(&request));
        assert_eq!(result.value[0].category, "Food");
        assert_eq!(result.value[0].impact_amount, 1000.0);
    }

    #[tokio::test]
    async fn test_empty_anomaly_reply_is_accepted() {
        let request = AnomalyRequest {
            monthly_limit: 10000.0,
            current_expenses: amounts(&[("Food", 6000.0)]),
            budget_allocations: amounts(&[("Food", 5000.0)]),
            ..Default::default()
        };
        let result = engine_with(MockBackend::new())
            .detect_anomalies(&request)
            .await
            .unwrap();

        assert_eq!(result.source.as_str(), "model");
        assert!(result.value.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_recommendations_fall_back() {
        let mock = MockBackend::new().with_reply(
            TaskType::Recommendations,
            r#"{"category": "Food", "message": "not a list"}"#,
        );
        let request = RecommendationRequest {
            income: 50000.0,
            current_month_expenses: amounts(&[("Food", 6000.0)]),
            budget_allocations: amounts(&[("Food", 5000.0)]),
            total_expenses: 6000.0,
            ..Default::default()
        };

        let result = engine_with(mock)
            .generate_recommendations(&request)
            .await
            .unwrap();
        assert_eq!(
            result.source.fallback_reason().map(AIError::kind),
            Some("schema_mismatch")
        );
        assert_eq!(result.value, recommend::recommend(&request));
        assert!(!result.value.is_empty());
    }

    #[tokio::test]
    async fn test_empty_advice_falls_back() {
        let mock = MockBackend::new().with_reply(TaskType::FinancialAdvice, "   ");
        let request = AdviceRequest {
            income: 50000.0,
            total_expenses: 45000.0,
            savings: 5000.0,
            target_savings: 10000.0,
            anomaly_count: 2,
        };

        let result = engine_with(mock).financial_advice(&request).await.unwrap();
        assert_eq!(result.source.as_str(), "fallback");
        assert_eq!(result.value, recommend::advise(&request));
    }

    #[tokio::test]
    async fn test_model_name_follows_override() {
        let client = AIClient::Mock(MockBackend::new()).with_model("llama3-70b-8192");
        let result = FinanceEngine::new(Some(client))
            .financial_advice(&AdviceRequest::default())
            .await
            .unwrap();
        assert_eq!(result.source.model(), Some("llama3-70b-8192"));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let request = BudgetRequest::new(-1.0, 0.0);
        let err = FinanceEngine::offline()
            .generate_budget_plan(&request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("income"));
    }
}
