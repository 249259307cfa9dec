//! Domain models for the budgeting and anomaly engine
//!
//! All records are transient values: constructed per request, handed back to
//! the caller, and persisted (if at all) by the surrounding service.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pseudo-category used for aggregate (whole-month) anomalies
pub const OVERALL_BUDGET: &str = "Overall Budget";

/// Currency symbol used in generated text
pub const CURRENCY: &str = "₹";

/// Per-category amounts keyed by category name
pub type CategoryAmounts = BTreeMap<String, f64>;

/// Spending categories, in allocation priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Rent,
    Food,
    Bills,
    Transport,
    Healthcare,
    Education,
    Shopping,
    Entertainment,
    Other,
}

impl Category {
    /// Get the display name for this category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rent => "Rent",
            Self::Food => "Food",
            Self::Bills => "Bills",
            Self::Transport => "Transport",
            Self::Healthcare => "Healthcare",
            Self::Education => "Education",
            Self::Shopping => "Shopping",
            Self::Entertainment => "Entertainment",
            Self::Other => "Other",
        }
    }

    /// All categories in priority order
    pub fn all() -> &'static [Category] {
        &[
            Self::Rent,
            Self::Food,
            Self::Bills,
            Self::Transport,
            Self::Healthcare,
            Self::Education,
            Self::Shopping,
            Self::Entertainment,
            Self::Other,
        ]
    }

    /// Allowed `(min, max)` share of the spendable amount
    pub fn share_range(&self) -> (f64, f64) {
        match self {
            Self::Rent => (0.25, 0.35),
            Self::Food => (0.15, 0.25),
            Self::Bills => (0.10, 0.15),
            Self::Transport => (0.08, 0.12),
            Self::Healthcare => (0.05, 0.10),
            Self::Education => (0.05, 0.15),
            Self::Shopping => (0.05, 0.10),
            Self::Entertainment => (0.03, 0.08),
            Self::Other => (0.02, 0.05),
        }
    }

    /// Midpoint of the share range, used when there is no spending history
    pub fn default_share(&self) -> f64 {
        let (min, max) = self.share_range();
        (min + max) / 2.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// Input to the budget allocator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetRequest {
    pub income: f64,
    pub target_savings: f64,
    #[serde(default)]
    pub loan_commitments: f64,
    /// Historical spending per category (optional, names match any case)
    #[serde(default)]
    pub past_expenses: Option<CategoryAmounts>,
}

impl BudgetRequest {
    pub fn new(income: f64, target_savings: f64) -> Self {
        Self {
            income,
            target_savings,
            ..Default::default()
        }
    }

    pub fn with_loans(mut self, loan_commitments: f64) -> Self {
        self.loan_commitments = loan_commitments;
        self
    }

    pub fn with_past_expenses(mut self, past_expenses: CategoryAmounts) -> Self {
        self.past_expenses = Some(past_expenses);
        self
    }

    /// Pool available for category allocation
    pub fn spendable(&self) -> f64 {
        self.income - self.target_savings - self.loan_commitments
    }

    /// Reject negative or non-finite money values
    pub fn validate(&self) -> Result<()> {
        check_amount("income", self.income)?;
        check_amount("target_savings", self.target_savings)?;
        check_amount("loan_commitments", self.loan_commitments)?;
        if let Some(ref past) = self.past_expenses {
            check_amounts("past_expenses", past)?;
        }
        Ok(())
    }
}

/// One category's share of the budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    pub category: Category,
    pub allocated_amount: f64,
}

/// Input to the anomaly detector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyRequest {
    pub income: f64,
    pub monthly_limit: f64,
    pub target_savings: f64,
    pub current_expenses: CategoryAmounts,
    #[serde(default)]
    pub budget_allocations: CategoryAmounts,
    #[serde(default)]
    pub last_month_expenses: CategoryAmounts,
}

impl AnomalyRequest {
    pub fn validate(&self) -> Result<()> {
        check_amount("income", self.income)?;
        check_amount("monthly_limit", self.monthly_limit)?;
        check_amount("target_savings", self.target_savings)?;
        check_amounts("current_expenses", &self.current_expenses)?;
        check_amounts("budget_allocations", &self.budget_allocations)?;
        check_amounts("last_month_expenses", &self.last_month_expenses)?;
        Ok(())
    }

    /// Total spent across all categories this period
    pub fn total_current(&self) -> f64 {
        self.current_expenses.values().sum()
    }
}

/// A flagged spending issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Spending category, or [`OVERALL_BUDGET`] for aggregate issues
    pub category: String,
    pub issue: String,
    pub impact_amount: f64,
    pub recommendation: String,
}

impl Anomaly {
    pub fn is_aggregate(&self) -> bool {
        self.category == OVERALL_BUDGET
    }
}

/// Tone of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Warning,
    Success,
    #[default]
    Info,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Info => "info",
        }
    }
}

impl FromStr for RecommendationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warning" => Ok(Self::Warning),
            "success" => Ok(Self::Success),
            "info" => Ok(Self::Info),
            _ => Err(format!("Unknown recommendation type: {}", s)),
        }
    }
}

/// Actionable advice attached to a category (or a coined label)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: RecommendationType,
}

/// Input to the recommendation generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub income: f64,
    pub current_month_expenses: CategoryAmounts,
    #[serde(default)]
    pub last_month_expenses: CategoryAmounts,
    #[serde(default)]
    pub budget_allocations: CategoryAmounts,
    pub total_expenses: f64,
}

impl RecommendationRequest {
    pub fn validate(&self) -> Result<()> {
        check_amount("income", self.income)?;
        check_amount("total_expenses", self.total_expenses)?;
        check_amounts("current_month_expenses", &self.current_month_expenses)?;
        check_amounts("last_month_expenses", &self.last_month_expenses)?;
        check_amounts("budget_allocations", &self.budget_allocations)?;
        Ok(())
    }
}

/// Input to the free-text financial advisor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdviceRequest {
    pub income: f64,
    pub total_expenses: f64,
    /// Savings this period (may be negative when spending exceeds income)
    pub savings: f64,
    pub target_savings: f64,
    #[serde(default)]
    pub anomaly_count: u32,
}

impl AdviceRequest {
    pub fn validate(&self) -> Result<()> {
        check_amount("income", self.income)?;
        check_amount("total_expenses", self.total_expenses)?;
        check_amount("target_savings", self.target_savings)?;
        if !self.savings.is_finite() {
            return Err(Error::InvalidData("savings must be a finite number".into()));
        }
        Ok(())
    }
}

fn check_amount(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidData(format!(
            "{} must be a non-negative amount (got {})",
            name, value
        )));
    }
    Ok(())
}

fn check_amounts(name: &str, values: &CategoryAmounts) -> Result<()> {
    for (category, amount) in values {
        check_amount(&format!("{}[{}]", name, category), *amount)?;
    }
    Ok(())
}
