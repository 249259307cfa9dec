//! Normalization helpers shared by the rule-based and model-backed paths
//!
//! Whatever produced the raw numbers, allocations handed back to the caller
//! never sum above the spendable amount and every money field is in cents.

use crate::models::{Anomaly, CategoryAllocation};

/// Allowed absolute gap between a model's allocation total and the spendable
/// amount before the allocations are rescaled
pub const RECONCILE_TOLERANCE: f64 = 1.0;

/// Round a money value to 2 decimal places (half away from zero)
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sum of allocated amounts
pub fn allocation_total(allocations: &[CategoryAllocation]) -> f64 {
    allocations.iter().map(|a| a.allocated_amount).sum()
}

/// Scale every allocation by `target / total` and re-round
fn scale_to(allocations: &mut [CategoryAllocation], target: f64) {
    let total = allocation_total(allocations);
    if total <= 0.0 {
        return;
    }
    let factor = target / total;
    for allocation in allocations.iter_mut() {
        allocation.allocated_amount = round_currency(allocation.allocated_amount * factor);
    }
}

/// Remove cent-level rounding overshoot from the largest allocation
fn trim_overshoot(allocations: &mut [CategoryAllocation], spendable: f64) {
    let overshoot = round_currency(allocation_total(allocations) - spendable);
    if overshoot <= 0.0 {
        return;
    }
    if let Some(largest) = allocations
        .iter_mut()
        .max_by(|a, b| a.allocated_amount.total_cmp(&b.allocated_amount))
    {
        largest.allocated_amount = round_currency(largest.allocated_amount - overshoot);
    }
}

/// Scale allocations down when they exceed the spendable amount.
///
/// Compliant input is returned unchanged.
pub fn cap_to_spendable(allocations: &mut [CategoryAllocation], spendable: f64) {
    if allocation_total(allocations) > spendable {
        scale_to(allocations, spendable);
        trim_overshoot(allocations, spendable);
    }
}

/// Rescale untrusted allocations whose total is materially different from
/// the spendable amount (in either direction), then cap.
pub fn reconcile_to_spendable(allocations: &mut [CategoryAllocation], spendable: f64) {
    let total = allocation_total(allocations);
    if total > 0.0 && (total - spendable).abs() > RECONCILE_TOLERANCE {
        scale_to(allocations, spendable);
    }
    for allocation in allocations.iter_mut() {
        allocation.allocated_amount = round_currency(allocation.allocated_amount);
    }
    cap_to_spendable(allocations, spendable);
}

/// Round every anomaly's impact to cents
pub fn round_anomalies(anomalies: &mut [Anomaly]) {
    for anomaly in anomalies.iter_mut() {
        anomaly.impact_amount = round_currency(anomaly.impact_amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn allocs(amounts: &[(Category, f64)]) -> Vec<CategoryAllocation> {
        amounts
            .iter()
            .map(|&(category, allocated_amount)| CategoryAllocation {
                category,
                allocated_amount,
            })
            .collect()
    }

    #[test]
    fn test_round_currency() {
        assert_eq!(round_currency(12.346), 12.35);
        assert_eq!(round_currency(12.344), 12.34);
        assert_eq!(round_currency(-1.005_1), -1.01);
        assert_eq!(round_currency(0.0), 0.0);
    }

    #[test]
    fn test_cap_scales_down() {
        let mut a = allocs(&[(Category::Rent, 600.0), (Category::Food, 600.0)]);
        cap_to_spendable(&mut a, 1000.0);
        assert_eq!(a[0].allocated_amount, 500.0);
        assert_eq!(a[1].allocated_amount, 500.0);
    }

    #[test]
    fn test_cap_is_noop_for_compliant_input() {
        let original = allocs(&[(Category::Rent, 300.0), (Category::Food, 199.99)]);
        let mut a = original.clone();
        cap_to_spendable(&mut a, 500.0);
        assert_eq!(a, original);

        // Idempotent after a real correction too
        let mut b = allocs(&[
            (Category::Rent, 333.33),
            (Category::Food, 333.33),
            (Category::Bills, 333.35),
        ]);
        cap_to_spendable(&mut b, 700.0);
        let once = b.clone();
        cap_to_spendable(&mut b, 700.0);
        assert_eq!(b, once);
    }

    #[test]
    fn test_cap_never_overshoots_by_rounding() {
        // Each scaled share rounds up to 0.02, leaving the total a cent over
        let mut a = allocs(&[
            (Category::Rent, 0.03),
            (Category::Food, 0.03),
            (Category::Bills, 0.03),
        ]);
        cap_to_spendable(&mut a, 0.05);
        assert!(allocation_total(&a) <= 0.05 + 1e-9);
        assert!(a.iter().all(|x| x.allocated_amount > 0.0));
    }

    #[test]
    fn test_reconcile_scales_up_untrusted_totals() {
        let mut a = allocs(&[(Category::Rent, 100.0), (Category::Food, 100.0)]);
        reconcile_to_spendable(&mut a, 1000.0);
        assert_eq!(a[0].allocated_amount, 500.0);
        assert_eq!(a[1].allocated_amount, 500.0);
    }

    #[test]
    fn test_reconcile_tolerates_small_gaps() {
        let mut a = allocs(&[(Category::Rent, 499.5), (Category::Food, 500.0)]);
        reconcile_to_spendable(&mut a, 1000.0);
        assert_eq!(a[0].allocated_amount, 499.5);
        assert_eq!(a[1].allocated_amount, 500.0);
    }

    #[test]
    fn test_reconcile_caps_small_overshoot() {
        let mut a = allocs(&[(Category::Rent, 500.5), (Category::Food, 500.0)]);
        reconcile_to_spendable(&mut a, 1000.0);
        assert!(allocation_total(&a) <= 1000.0 + 1e-9);
    }
}
