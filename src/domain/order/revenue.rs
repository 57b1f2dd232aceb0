use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;

// ============================================================================
// Revenue Share Rate Engine
// ============================================================================
//
// Computes the platform's cut of an order, decayed by repeat business:
// each prior order the same client placed in the same industry shaves
// 0.025 off the industry base rate. The series holds while the computed
// rate stays at or above 0.05; deeper decay snaps to the 0.065 floor.
//
// Triggered exactly once per order, the first time an installment is paid
// while the order awaits payment. A second record is an error.
//
// ============================================================================

/// Decay per prior order in the same industry: 0.025.
fn decay_per_order() -> Decimal {
    Decimal::new(25, 3)
}

/// Computed rates below this cut-off (0.05) snap to the floor.
fn decay_cutoff() -> Decimal {
    Decimal::new(5, 2)
}

/// Minimum rate the platform ever takes: 0.065.
fn floor_rate() -> Decimal {
    Decimal::new(65, 3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevenueShareStatus {
    Unpaid,
    Paid,
}

impl RevenueShareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevenueShareStatus::Unpaid => "unpaid",
            RevenueShareStatus::Paid => "paid",
        }
    }
}

/// One-to-one with an order that completed negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueShare {
    pub id: Uuid,
    /// Rate actually applied, after decay and flooring.
    pub rate: Decimal,
    pub order_amount: Decimal,
    pub share_amount: Decimal,
    pub status: RevenueShareStatus,
    pub created_at: DateTime<Utc>,
}

/// Inputs the command handler resolves before the aggregate runs: the
/// template's industry base rate and the client's prior order count in
/// that industry (excluding the current order).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RevenueTerms {
    pub base_rate: Decimal,
    pub prior_orders: i64,
}

/// Rate after repeat-business decay.
pub fn applied_rate(terms: &RevenueTerms) -> Decimal {
    let computed = terms.base_rate - decay_per_order() * Decimal::from(terms.prior_orders);
    if computed >= decay_cutoff() {
        computed
    } else {
        floor_rate()
    }
}

/// Build the single revenue-share record for an order.
///
/// `existing` guards the one-record invariant; callers pass the order's
/// current record slot.
pub fn build_record(
    existing: Option<&RevenueShare>,
    terms: &RevenueTerms,
    order_amount: Decimal,
) -> Result<RevenueShare, OrderError> {
    if existing.is_some() {
        return Err(OrderError::RevenueShareAlreadyRecorded);
    }

    let rate = applied_rate(terms);
    Ok(RevenueShare {
        id: Uuid::new_v4(),
        rate,
        order_amount,
        share_amount: order_amount * rate,
        status: RevenueShareStatus::Unpaid,
        created_at: Utc::now(),
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn terms(base: Decimal, prior: i64) -> RevenueTerms {
        RevenueTerms { base_rate: base, prior_orders: prior }
    }

    #[test]
    fn rate_decays_per_prior_order() {
        assert_eq!(applied_rate(&terms(dec!(0.10), 0)), dec!(0.10));
        assert_eq!(applied_rate(&terms(dec!(0.10), 1)), dec!(0.075));
        assert_eq!(applied_rate(&terms(dec!(0.10), 2)), dec!(0.050));
    }

    #[test]
    fn deep_decay_floors_at_the_minimum_rate() {
        assert_eq!(applied_rate(&terms(dec!(0.10), 3)), dec!(0.065));
        assert_eq!(applied_rate(&terms(dec!(0.10), 10)), dec!(0.065));
        assert_eq!(applied_rate(&terms(dec!(0.08), 2)), dec!(0.065));
    }

    #[test]
    fn share_amount_is_total_times_rate() {
        let record = build_record(None, &terms(dec!(0.10), 1), dec!(500)).unwrap();
        assert_eq!(record.rate, dec!(0.075));
        assert_eq!(record.order_amount, dec!(500));
        assert_eq!(record.share_amount, dec!(37.500));
        assert_eq!(record.status, RevenueShareStatus::Unpaid);
    }

    #[test]
    fn second_record_is_an_error() {
        let first = build_record(None, &terms(dec!(0.10), 0), dec!(100)).unwrap();
        let err = build_record(Some(&first), &terms(dec!(0.10), 0), dec!(100)).unwrap_err();
        assert!(matches!(err, OrderError::RevenueShareAlreadyRecorded));
    }
}
