use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contract::Contract;
use super::delivery::{DeliveryItem, DeliveryStatus};
use super::installments::{InstallmentStatus, PaymentInstallment};
use super::revenue::{RevenueShare, RevenueShareStatus};
use super::value_objects::{Actor, BlockResolution, ConfirmationBlock, OrderStatus, Role};
use crate::domain::template::ServiceTemplate;
use crate::event_sourcing::core::DomainEvent;

// ============================================================================
// Order Events - Domain Events for the Order Aggregate
// ============================================================================

/// Union type for all order events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Created(OrderCreated),
    BlockResolved(BlockResolved),
    QuoteRequested(QuoteRequested),
    QuoteSent(QuoteSent),
    QuoteAccepted(QuoteAccepted),
    QuoteRejected(QuoteRejected),
    ContractSigned(ContractSigned),
    InstallmentsScheduled(InstallmentsScheduled),
    DeliveriesInitialized(DeliveriesInitialized),
    ContractChangeRequested(ContractChangeRequested),
    ContractChangeResolved(ContractChangeResolved),
    PaymentStatusUpdated(PaymentStatusUpdated),
    RevenueShareRecorded(RevenueShareRecorded),
    RevenueShareStatusUpdated(RevenueShareStatusUpdated),
    DeliveryItemAdded(DeliveryItemAdded),
    DeliveryStatusUpdated(DeliveryStatusUpdated),
    StatusChanged(StatusChanged),
}

impl DomainEvent for OrderEvent {
    fn event_type() -> &'static str { "OrderEvent" }
}

impl OrderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OrderEvent::Created(_) => "OrderCreated",
            OrderEvent::BlockResolved(_) => "BlockResolved",
            OrderEvent::QuoteRequested(_) => "QuoteRequested",
            OrderEvent::QuoteSent(_) => "QuoteSent",
            OrderEvent::QuoteAccepted(_) => "QuoteAccepted",
            OrderEvent::QuoteRejected(_) => "QuoteRejected",
            OrderEvent::ContractSigned(_) => "ContractSigned",
            OrderEvent::InstallmentsScheduled(_) => "InstallmentsScheduled",
            OrderEvent::DeliveriesInitialized(_) => "DeliveriesInitialized",
            OrderEvent::ContractChangeRequested(_) => "ContractChangeRequested",
            OrderEvent::ContractChangeResolved(_) => "ContractChangeResolved",
            OrderEvent::PaymentStatusUpdated(_) => "PaymentStatusUpdated",
            OrderEvent::RevenueShareRecorded(_) => "RevenueShareRecorded",
            OrderEvent::RevenueShareStatusUpdated(_) => "RevenueShareStatusUpdated",
            OrderEvent::DeliveryItemAdded(_) => "DeliveryItemAdded",
            OrderEvent::DeliveryStatusUpdated(_) => "DeliveryStatusUpdated",
            OrderEvent::StatusChanged(_) => "StatusChanged",
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Initial event: the order snapshot deep-copied out of a template.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub order_number: String,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub template: ServiceTemplate,
    /// Deep copies of the template's negotiation blocks.
    pub blocks: Vec<ConfirmationBlock>,
    pub total_price: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BlockResolved {
    pub block_id: Uuid,
    pub resolution: BlockResolution,
}

/// A fresh Active contract was built from the template.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuoteRequested {
    pub contract: Contract,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuoteSent {
    pub contract_id: Uuid,
    pub price: Decimal,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuoteAccepted {
    pub contract_id: Uuid,
    pub signed_at: DateTime<Utc>,
}

/// The previous Active contract was retired and replaced.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct QuoteRejected {
    pub retired_contract_id: Uuid,
    pub contract: Contract,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContractSigned {
    pub contract_id: Uuid,
    pub role: Role,
    pub signed_at: DateTime<Utc>,
    pub signature_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InstallmentsScheduled {
    pub installments: Vec<PaymentInstallment>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeliveriesInitialized {
    pub items: Vec<DeliveryItem>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContractChangeRequested {
    pub contract_id: Uuid,
    pub reason: String,
    pub proposed_text: Option<String>,
    pub requested_by: Role,
    pub requested_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ContractChangeResolved {
    pub contract_id: Uuid,
    pub approved: bool,
    pub resolved_by: Role,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PaymentStatusUpdated {
    pub installment_id: Uuid,
    pub status: InstallmentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RevenueShareRecorded {
    pub record: RevenueShare,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RevenueShareStatusUpdated {
    pub status: RevenueShareStatus,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeliveryItemAdded {
    pub item: DeliveryItem,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeliveryStatusUpdated {
    pub delivery_id: Uuid,
    pub status: DeliveryStatus,
    pub comment: Option<String>,
    pub is_final: bool,
    pub at: DateTime<Utc>,
}

/// Generic lifecycle transition, including terminal ones.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StatusChanged {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub reason: Option<String>,
    pub by: Option<Actor>,
}
