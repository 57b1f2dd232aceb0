use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::value_objects::{BankAccount, ConfirmationBlock};

// ============================================================================
// Service Template - Read-Only Negotiation Input
// ============================================================================
//
// A template is the provider's published offering: a starting price, the
// negotiable confirmation blocks shown to the client, ordered discounts,
// and the contract text the order's contracts are copied from.
//
// Orders deep-copy everything they need out of the template at creation
// time. The aggregate never holds a live reference back into template
// storage, so later template edits cannot alter in-flight orders.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTemplate {
    pub id: Uuid,
    pub name: String,
    pub industry_id: Uuid,
    /// Platform base cut for this template's industry, e.g. 0.10.
    pub industry_base_rate: Decimal,
    pub starting_price: Decimal,
    /// Negotiation blocks presented to the client, in display order.
    pub blocks: Vec<ConfirmationBlock>,
    /// Applied in declaration order against the running price.
    pub discounts: Vec<TemplateDiscount>,
    /// Contract body copied into every contract built for an order.
    pub contract_blocks: Vec<ConfirmationBlock>,
    /// Receiving account snapshotted into each installment.
    pub receiving_account: BankAccount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDiscount {
    pub kind: DiscountKind,
    pub value: Decimal,
    /// Minimum running price for the discount to apply. None = always.
    pub threshold: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    /// Subtracts `price * value / 100`.
    Percentage,
    /// Subtracts `value` outright.
    Fixed,
}
