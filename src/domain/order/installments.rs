use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::value_objects::BankAccount;

// ============================================================================
// Installment Planner
// ============================================================================
//
// Splits a signed contract's price into N installments per a named plan.
// Every amount except the last is rounded to 2 decimals; the last one is
// forced to price minus the sum of the others, so the total is exact for
// any price. A plan whose declared ratios do not sum to 1 is a fatal
// configuration error and produces nothing.
//
// ============================================================================

const RATIO_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Failed,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::Paid => "paid",
            InstallmentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInstallment {
    pub id: Uuid,
    /// 1-based position within the plan.
    pub number: u32,
    pub amount: Decimal,
    pub status: InstallmentStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Private snapshot; edits to the provider's account never reach here.
    pub account: BankAccount,
}

/// A named, fixed ratio sequence.
///
/// Two-way plans support nine weightings from 10/90 (`Installment2_1`)
/// through 90/10 (`Installment2_9`). Wider plans are fixed splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentPlan {
    FullPayment,
    /// First installment takes `k * 10%`, k in 1..=9.
    TwoWay { first_tenths: u8 },
    ThreeEqual,
    ThreeFrontLoaded,
    ThreeBackLoaded,
    FourEqual,
    FiveEqual,
}

impl PaymentPlan {
    /// Parse a plan name as carried by a payment confirmation block.
    pub fn parse(name: &str) -> Result<Self, OrderError> {
        match name {
            "FullPayment" => Ok(PaymentPlan::FullPayment),
            "Installment3_1" => Ok(PaymentPlan::ThreeEqual),
            "Installment3_2" => Ok(PaymentPlan::ThreeFrontLoaded),
            "Installment3_3" => Ok(PaymentPlan::ThreeBackLoaded),
            "Installment4_1" => Ok(PaymentPlan::FourEqual),
            "Installment5_1" => Ok(PaymentPlan::FiveEqual),
            other => {
                if let Some(k) = other.strip_prefix("Installment2_") {
                    if let Ok(k @ 1..=9) = k.parse::<u8>() {
                        return Ok(PaymentPlan::TwoWay { first_tenths: k });
                    }
                }
                Err(OrderError::Configuration(format!(
                    "unknown payment plan: {other}"
                )))
            }
        }
    }

    fn ratios(&self) -> Vec<f64> {
        match self {
            PaymentPlan::FullPayment => vec![1.0],
            PaymentPlan::TwoWay { first_tenths } => {
                let first = f64::from(*first_tenths) / 10.0;
                vec![first, 1.0 - first]
            }
            PaymentPlan::ThreeEqual => vec![1.0 / 3.0; 3],
            PaymentPlan::ThreeFrontLoaded => vec![0.5, 0.3, 0.2],
            PaymentPlan::ThreeBackLoaded => vec![0.2, 0.3, 0.5],
            PaymentPlan::FourEqual => vec![0.25; 4],
            PaymentPlan::FiveEqual => vec![0.2; 5],
        }
    }
}

/// Build the installment schedule for a contract price.
///
/// Fails closed: any ratio misconfiguration yields an error and zero
/// installments, never a partial schedule.
pub fn plan_installments(
    plan: PaymentPlan,
    price: Decimal,
    account: &BankAccount,
) -> Result<Vec<PaymentInstallment>, OrderError> {
    if price < Decimal::ZERO {
        return Err(OrderError::Validation(format!(
            "installment planning requires a non-negative price, got {price}"
        )));
    }

    let ratios = plan.ratios();
    let sum: f64 = ratios.iter().sum();
    if (sum - 1.0).abs() > RATIO_EPSILON {
        return Err(OrderError::Configuration(format!(
            "ratios for {plan:?} sum to {sum}, expected 1"
        )));
    }

    let mut installments = Vec::with_capacity(ratios.len());
    let mut allocated = Decimal::ZERO;
    let last = ratios.len() - 1;

    for (idx, ratio) in ratios.iter().enumerate() {
        let amount = if idx == last {
            // Absorbs all rounding drift so the sum is exactly the price.
            price - allocated
        } else {
            let ratio = Decimal::try_from(*ratio).map_err(|e| {
                OrderError::Configuration(format!("ratio {ratio} for {plan:?}: {e}"))
            })?;
            (price * ratio).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };
        allocated += amount;

        installments.push(PaymentInstallment {
            id: Uuid::new_v4(),
            number: (idx + 1) as u32,
            amount,
            status: InstallmentStatus::Pending,
            due_at: None,
            paid_at: None,
            account: account.clone(),
        });
    }

    Ok(installments)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account() -> BankAccount {
        BankAccount {
            bank_name: "First Bank".into(),
            account_number: "000-1".into(),
            holder_name: "Studio".into(),
        }
    }

    fn total(installments: &[PaymentInstallment]) -> Decimal {
        installments.iter().map(|i| i.amount).sum()
    }

    #[test]
    fn full_payment_is_a_single_installment() {
        let plan = plan_installments(PaymentPlan::FullPayment, dec!(500), &account()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].number, 1);
        assert_eq!(plan[0].amount, dec!(500));
        assert_eq!(plan[0].status, InstallmentStatus::Pending);
    }

    #[test]
    fn thirds_on_awkward_price_sum_exactly() {
        let plan = plan_installments(PaymentPlan::ThreeEqual, dec!(100.01), &account()).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].amount, dec!(33.34));
        assert_eq!(plan[1].amount, dec!(33.34));
        assert_eq!(plan[2].amount, dec!(33.33));
        assert_eq!(total(&plan), dec!(100.01));
    }

    #[test]
    fn every_plan_sums_exactly_for_awkward_prices() {
        let plans = [
            PaymentPlan::FullPayment,
            PaymentPlan::TwoWay { first_tenths: 1 },
            PaymentPlan::TwoWay { first_tenths: 5 },
            PaymentPlan::TwoWay { first_tenths: 9 },
            PaymentPlan::ThreeEqual,
            PaymentPlan::ThreeFrontLoaded,
            PaymentPlan::ThreeBackLoaded,
            PaymentPlan::FourEqual,
            PaymentPlan::FiveEqual,
        ];
        let prices = [dec!(0.01), dec!(99.99), dec!(100.01), dec!(1234.567), dec!(500)];

        for plan in plans {
            for price in prices {
                let installments = plan_installments(plan, price, &account()).unwrap();
                assert_eq!(total(&installments), price, "{plan:?} on {price}");
            }
        }
    }

    #[test]
    fn two_way_weighting_splits_by_tenths() {
        let plan =
            plan_installments(PaymentPlan::TwoWay { first_tenths: 3 }, dec!(200), &account())
                .unwrap();
        assert_eq!(plan[0].amount, dec!(60.00));
        assert_eq!(plan[1].amount, dec!(140.00));
    }

    #[test]
    fn unknown_plan_name_is_a_configuration_error() {
        let err = PaymentPlan::parse("Installment7_3").unwrap_err();
        assert!(matches!(err, OrderError::Configuration(_)));

        let err = PaymentPlan::parse("Installment2_0").unwrap_err();
        assert!(matches!(err, OrderError::Configuration(_)));
    }

    #[test]
    fn plan_names_parse() {
        assert_eq!(PaymentPlan::parse("FullPayment").unwrap(), PaymentPlan::FullPayment);
        assert_eq!(
            PaymentPlan::parse("Installment2_9").unwrap(),
            PaymentPlan::TwoWay { first_tenths: 9 }
        );
        assert_eq!(PaymentPlan::parse("Installment3_1").unwrap(), PaymentPlan::ThreeEqual);
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = plan_installments(PaymentPlan::FullPayment, dec!(-1), &account()).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn installments_snapshot_the_account_by_value() {
        let mut acct = account();
        let plan = plan_installments(PaymentPlan::FullPayment, dec!(100), &acct).unwrap();
        acct.account_number = "changed".into();
        assert_eq!(plan[0].account.account_number, "000-1");
    }
}
