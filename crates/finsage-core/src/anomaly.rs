//! Rule-based spending anomaly detection
//!
//! Rules run in a fixed order:
//!
//! 1. Overspend: category spend above its allocation
//! 2. Spike: category spend more than 30% above last month
//! 3. Outlier: category spend above twice the per-category average
//! 4. Over limit: total spend above the monthly limit
//! 5. Approaching limit: total spend above 90% of the limit (only if 4 did not fire)
//!
//! A category flagged by an earlier per-category rule is skipped by the later
//! ones. The two aggregate rules are reported under [`OVERALL_BUDGET`].

use std::collections::HashSet;

use tracing::info;

use crate::models::{Anomaly, AnomalyRequest, CURRENCY, OVERALL_BUDGET};
use crate::normalize::round_anomalies;

/// Month-over-month increase (as a ratio) that counts as a spike
pub const SPIKE_THRESHOLD: f64 = 0.30;

/// Multiple of the per-category average that counts as an outlier
pub const OUTLIER_MULTIPLIER: f64 = 2.0;

/// Fraction of the monthly limit at which spending is "approaching" it
pub const APPROACHING_LIMIT_RATIO: f64 = 0.9;

/// Run all detection rules and return the flagged anomalies
pub fn detect(request: &AnomalyRequest) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    let mut detected: HashSet<&str> = HashSet::new();

    detect_overspend(request, &mut detected, &mut anomalies);
    detect_spikes(request, &mut detected, &mut anomalies);
    detect_outliers(request, &mut detected, &mut anomalies);
    detect_limit_breach(request, &mut anomalies);

    round_anomalies(&mut anomalies);
    info!(count = anomalies.len(), "Rule-based anomaly detection complete");
    anomalies
}

/// Rule 1: spend above the category allocation
fn detect_overspend<'a>(
    request: &'a AnomalyRequest,
    detected: &mut HashSet<&'a str>,
    anomalies: &mut Vec<Anomaly>,
) {
    for (category, &current) in &request.current_expenses {
        let Some(&allocated) = request.budget_allocations.get(category) else {
            continue;
        };
        if current > allocated {
            let overspend = current - allocated;
            anomalies.push(Anomaly {
                category: category.clone(),
                issue: format!(
                    "{} spending exceeded budget by {}{:.2}",
                    category, CURRENCY, overspend
                ),
                impact_amount: overspend,
                recommendation: format!(
                    "Reduce {} spending by {}{:.2} to stay within {}{:.2} budget",
                    category, CURRENCY, overspend, CURRENCY, allocated
                ),
            });
            detected.insert(category.as_str());
        }
    }
}

/// Rule 2: spend more than 30% above last month
fn detect_spikes<'a>(
    request: &'a AnomalyRequest,
    detected: &mut HashSet<&'a str>,
    anomalies: &mut Vec<Anomaly>,
) {
    for (category, &current) in &request.current_expenses {
        if detected.contains(category.as_str()) {
            continue;
        }
        let Some(&last) = request.last_month_expenses.get(category) else {
            continue;
        };
        if last <= 0.0 {
            continue;
        }

        let increase = (current - last) / last;
        if increase > SPIKE_THRESHOLD {
            let increase_amount = current - last;
            anomalies.push(Anomaly {
                category: category.clone(),
                issue: format!(
                    "{} spending increased by {:.1}% compared to last month",
                    category,
                    increase * 100.0
                ),
                impact_amount: increase_amount,
                recommendation: format!(
                    "Review {} expenses and reduce by {}{:.2} to match last month's spending",
                    category, CURRENCY, increase_amount
                ),
            });
            detected.insert(category.as_str());
        }
    }
}

/// Rule 3: spend far above the average across this month's categories.
///
/// The average is over category totals, not individual transactions.
fn detect_outliers<'a>(
    request: &'a AnomalyRequest,
    detected: &mut HashSet<&'a str>,
    anomalies: &mut Vec<Anomaly>,
) {
    if request.current_expenses.is_empty() {
        return;
    }
    let average = request.total_current() / request.current_expenses.len() as f64;
    if average <= 0.0 {
        return;
    }

    for (category, &amount) in &request.current_expenses {
        if detected.contains(category.as_str()) {
            continue;
        }
        if amount > average * OUTLIER_MULTIPLIER {
            let excess = amount - average;
            anomalies.push(Anomaly {
                category: category.clone(),
                issue: format!(
                    "Unusually large {} expense of {}{:.2} detected (2× average)",
                    category, CURRENCY, amount
                ),
                impact_amount: excess,
                recommendation: format!(
                    "Verify if this {} expense was necessary. Consider spreading large expenses across months",
                    category
                ),
            });
            detected.insert(category.as_str());
        }
    }
}

/// Rules 4 and 5: total spend against the monthly limit
fn detect_limit_breach(request: &AnomalyRequest, anomalies: &mut Vec<Anomaly>) {
    let total = request.total_current();
    let limit = request.monthly_limit;

    if total > limit {
        let excess = total - limit;
        anomalies.push(Anomaly {
            category: OVERALL_BUDGET.to_string(),
            issue: format!(
                "Total expenses exceeded monthly limit by {}{:.2}",
                CURRENCY, excess
            ),
            impact_amount: excess,
            recommendation: format!(
                "Reduce discretionary spending by {}{:.2} to meet your savings goal of {}{:.2}",
                CURRENCY, excess, CURRENCY, request.target_savings
            ),
        });
    } else if total > limit * APPROACHING_LIMIT_RATIO {
        let remaining = limit - total;
        anomalies.push(Anomaly {
            category: OVERALL_BUDGET.to_string(),
            issue: format!(
                "You've used {:.1}% of your monthly budget",
                total / limit * 100.0
            ),
            // The amount at risk is the whole spend, not the headroom
            impact_amount: total,
            recommendation: format!(
                "Only {}{:.2} remaining. Monitor spending carefully to avoid exceeding your limit",
                CURRENCY, remaining
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryAmounts;

    fn amounts(pairs: &[(&str, f64)]) -> CategoryAmounts {
        pairs.iter().map(|&(c, a)| (c.to_string(), a)).collect()
    }

    fn request(
        current: &[(&str, f64)],
        budget: &[(&str, f64)],
        last: &[(&str, f64)],
        monthly_limit: f64,
    ) -> AnomalyRequest {
        AnomalyRequest {
            income: 50000.0,
            monthly_limit,
            target_savings: 10000.0,
            current_expenses: amounts(current),
            budget_allocations: amounts(budget),
            last_month_expenses: amounts(last),
        }
    }

    fn for_category<'a>(anomalies: &'a [Anomaly], category: &str) -> Vec<&'a Anomaly> {
        anomalies.iter().filter(|a| a.category == category).collect()
    }

    #[test]
    fn test_overspend_flagged_once() {
        // Food also spiked vs last month and is an outlier, but is only reported once
        let req = request(
            &[("Food", 6000.0), ("Bills", 100.0), ("Transport", 100.0)],
            &[("Food", 5000.0)],
            &[("Food", 1000.0)],
            100000.0,
        );
        let anomalies = detect(&req);
        let food = for_category(&anomalies, "Food");
        assert_eq!(food.len(), 1);
        assert_eq!(food[0].impact_amount, 1000.00);
        assert!(food[0].issue.contains("exceeded budget"));
    }

    #[test]
    fn test_spike_boundary_is_strict() {
        let exact = request(&[("Food", 1300.0)], &[], &[("Food", 1000.0)], 100000.0);
        assert!(detect(&exact).is_empty());

        let over = request(&[("Food", 1301.0)], &[], &[("Food", 1000.0)], 100000.0);
        let anomalies = detect(&over);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].category, "Food");
        assert_eq!(anomalies[0].impact_amount, 301.00);
        assert!(anomalies[0].issue.contains("30.1%"));
    }

    #[test]
    fn test_spike_ignores_zero_last_month() {
        let req = request(&[("Food", 500.0)], &[], &[("Food", 0.0)], 100000.0);
        assert!(detect(&req).is_empty());
    }

    #[test]
    fn test_outlier_against_category_average() {
        // Average = (5000 + 500 + 500) / 3 = 2000; 5000 > 4000
        let req = request(
            &[("Shopping", 5000.0), ("Food", 500.0), ("Bills", 500.0)],
            &[],
            &[],
            100000.0,
        );
        let anomalies = detect(&req);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].category, "Shopping");
        assert_eq!(anomalies[0].impact_amount, 3000.00);
    }

    #[test]
    fn test_single_category_is_never_an_outlier() {
        let req = request(&[("Food", 9000.0)], &[], &[], 100000.0);
        assert!(detect(&req).is_empty());
    }

    #[test]
    fn test_total_over_limit() {
        let req = request(&[("Food", 6000.0), ("Rent", 6000.0)], &[], &[], 10000.0);
        let anomalies = detect(&req);
        let overall = for_category(&anomalies, OVERALL_BUDGET);
        assert_eq!(overall.len(), 1);
        assert_eq!(overall[0].impact_amount, 2000.00);
        assert!(overall[0].is_aggregate());
    }

    #[test]
    fn test_approaching_limit_reports_total() {
        let req = request(
            &[("Food", 3000.0), ("Rent", 3500.0), ("Bills", 3000.0)],
            &[],
            &[],
            10000.0,
        );
        let anomalies = detect(&req);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].category, OVERALL_BUDGET);
        assert_eq!(anomalies[0].impact_amount, 9500.00);
        assert!(anomalies[0].issue.contains("95.0%"));
        assert!(anomalies[0].recommendation.contains("500.00"));
    }

    #[test]
    fn test_aggregate_rules_are_exclusive() {
        let at_limit = request(&[("Food", 5000.0), ("Rent", 5000.0)], &[], &[], 10000.0);
        let anomalies = detect(&at_limit);
        assert_eq!(anomalies.len(), 1);
        // Exactly at the limit is "approaching", not "exceeded"
        assert_eq!(anomalies[0].impact_amount, 10000.00);
        assert!(anomalies[0].issue.contains("100.0%"));

        let under = request(&[("Food", 4500.0), ("Rent", 4500.0)], &[], &[], 10000.0);
        assert!(detect(&under).is_empty());
    }

    #[test]
    fn test_rule_order_in_output() {
        let req = request(
            &[
                ("Bills", 900.0),
                ("Entertainment", 3000.0),
                ("Food", 700.0),
                ("Other", 100.0),
                ("Transport", 100.0),
            ],
            &[("Food", 500.0)],
            &[("Bills", 500.0)],
            3000.0,
        );
        let anomalies = detect(&req);
        let categories: Vec<&str> = anomalies.iter().map(|a| a.category.as_str()).collect();
        // overspend, spike, outlier (avg 960 -> Entertainment), then aggregate
        assert_eq!(
            categories,
            vec!["Food", "Bills", "Entertainment", OVERALL_BUDGET]
        );
        assert_eq!(anomalies[3].impact_amount, 1800.00);
    }

    #[test]
    fn test_impact_is_rounded() {
        let req = request(&[("Food", 100.006)], &[("Food", 50.0)], &[], 100000.0);
        let anomalies = detect(&req);
        assert_eq!(anomalies[0].impact_amount, 50.01);
    }

    #[test]
    fn test_empty_input() {
        let req = request(&[], &[], &[], 0.0);
        assert!(detect(&req).is_empty());
    }
}
