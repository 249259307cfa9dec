//! Parsing and validation of model replies
//!
//! Replies are expected to be a bare JSON array, but models often wrap it in
//! a markdown code fence. Anything that is not JSON after fence stripping is
//! a `MalformedResponse`; JSON of the wrong shape is a `SchemaMismatch`.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::AIError;
use crate::models::{Anomaly, Category, CategoryAllocation, Recommendation, RecommendationType};
use crate::normalize::{reconcile_to_spendable, round_anomalies};

/// Longest raw-reply excerpt kept in error messages
const EXCERPT_CHARS: usize = 200;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("valid regex"))
}

/// Remove a surrounding ```json / ``` code fence, if present
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    match fence_regex().captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text
            .strip_prefix("```json")
            .or_else(|| text.strip_prefix("```"))
            .unwrap_or(text)
            .trim(),
    }
}

/// First characters of a reply, for error messages
fn excerpt(text: &str) -> String {
    if text.chars().count() > EXCERPT_CHARS {
        let head: String = text.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Parse a reply as a JSON array of raw values
fn parse_json_array(text: &str) -> Result<Vec<Value>, AIError> {
    let body = strip_code_fences(text);
    let value: Value = serde_json::from_str(body).map_err(|e| {
        AIError::MalformedResponse(format!("{} | Raw: {}", e, excerpt(body)))
    })?;

    match value {
        Value::Array(items) => Ok(items),
        other => Err(AIError::SchemaMismatch(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Deserialize every element into a typed record
fn typed_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, AIError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| AIError::SchemaMismatch(format!("element {}: {}", i, e)))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawAllocation {
    category: String,
    allocated_amount: f64,
}

#[derive(Debug, Deserialize)]
struct RawAnomaly {
    category: String,
    issue: String,
    impact_amount: f64,
    recommendation: String,
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    category: String,
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Validate a budget reply and reconcile it to the spendable amount.
///
/// Allocations come back in category priority order.
pub fn parse_budget_reply(text: &str, spendable: f64) -> Result<Vec<CategoryAllocation>, AIError> {
    let raw: Vec<RawAllocation> = typed_items(parse_json_array(text)?)?;
    if raw.is_empty() {
        return Err(AIError::SchemaMismatch("empty budget plan".into()));
    }

    let mut seen = HashSet::new();
    let mut allocations = Vec::with_capacity(raw.len());
    for item in raw {
        let category: Category = item
            .category
            .parse()
            .map_err(AIError::SchemaMismatch)?;
        if !seen.insert(category) {
            return Err(AIError::SchemaMismatch(format!(
                "duplicate category: {}",
                category
            )));
        }
        if !item.allocated_amount.is_finite() || item.allocated_amount <= 0.0 {
            return Err(AIError::SchemaMismatch(format!(
                "{} has non-positive amount {}",
                category, item.allocated_amount
            )));
        }
        allocations.push(CategoryAllocation {
            category,
            allocated_amount: item.allocated_amount,
        });
    }

    if let Some(missing) = Category::all().iter().find(|c| !seen.contains(*c)) {
        return Err(AIError::SchemaMismatch(format!(
            "budget plan is missing {}",
            missing
        )));
    }

    allocations.sort_by_key(|a| a.category);
    reconcile_to_spendable(&mut allocations, spendable);

    // Scaling can round a tiny share down to zero
    if let Some(zeroed) = allocations.iter().find(|a| a.allocated_amount <= 0.0) {
        return Err(AIError::SchemaMismatch(format!(
            "{} rounds to {} after reconciling",
            zeroed.category, zeroed.allocated_amount
        )));
    }
    Ok(allocations)
}

/// Validate an anomaly reply. An empty array means "nothing found".
pub fn parse_anomaly_reply(text: &str) -> Result<Vec<Anomaly>, AIError> {
    let raw: Vec<RawAnomaly> = typed_items(parse_json_array(text)?)?;

    let mut anomalies = Vec::with_capacity(raw.len());
    for item in raw {
        if item.category.trim().is_empty() {
            return Err(AIError::SchemaMismatch("anomaly with empty category".into()));
        }
        if !item.impact_amount.is_finite() || item.impact_amount < 0.0 {
            return Err(AIError::SchemaMismatch(format!(
                "{} has invalid impact {}",
                item.category, item.impact_amount
            )));
        }
        anomalies.push(Anomaly {
            category: item.category,
            issue: item.issue,
            impact_amount: item.impact_amount,
            recommendation: item.recommendation,
        });
    }

    round_anomalies(&mut anomalies);
    Ok(anomalies)
}

/// Validate a recommendation reply. A missing `type` means info.
pub fn parse_recommendation_reply(text: &str) -> Result<Vec<Recommendation>, AIError> {
    let raw: Vec<RawRecommendation> = typed_items(parse_json_array(text)?)?;
    if raw.is_empty() {
        return Err(AIError::SchemaMismatch("empty recommendation list".into()));
    }

    raw.into_iter()
        .map(|item| {
            let kind = match item.kind {
                Some(ref kind) => kind
                    .parse::<RecommendationType>()
                    .map_err(AIError::SchemaMismatch)?,
                None => RecommendationType::default(),
            };
            Ok(Recommendation {
                category: item.category,
                message: item.message,
                kind,
            })
        })
        .collect()
}

/// Plain-text advice; only an empty reply is rejected
pub fn parse_advice_reply(text: &str) -> Result<String, AIError> {
    let advice = strip_code_fences(text);
    if advice.is_empty() {
        return Err(AIError::MalformedResponse("empty advice text".into()));
    }
    Ok(advice.to_string())
}
