use rust_decimal::Decimal;
use uuid::Uuid;

use super::installments::InstallmentStatus;
use super::revenue::RevenueTerms;
use super::value_objects::{Actor, BlockResolution, OrderStatus};
use crate::domain::template::ServiceTemplate;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================
//
// Every command carries the acting user explicitly; there is no ambient
// security context to consult.
//
// ============================================================================

#[derive(Debug, Clone)]
pub enum OrderCommand {
    CreateFromTemplate {
        order_id: Uuid,
        order_number: String,
        client_id: Uuid,
        provider_id: Uuid,
        template: ServiceTemplate,
        actor: Actor,
    },
    ResolveBlock {
        block_id: Uuid,
        resolution: BlockResolution,
        actor: Actor,
    },
    RequestQuote {
        actor: Actor,
    },
    SendQuote {
        price: Decimal,
        actor: Actor,
    },
    AcceptQuote {
        actor: Actor,
    },
    RejectQuote {
        actor: Actor,
    },
    SignContract {
        contract_id: Uuid,
        signature_url: Option<String>,
        actor: Actor,
    },
    RequestContractChange {
        contract_id: Uuid,
        reason: String,
        proposed_text: Option<String>,
        actor: Actor,
    },
    ApproveContractChange {
        contract_id: Uuid,
        actor: Actor,
    },
    RejectContractChange {
        contract_id: Uuid,
        actor: Actor,
    },
    UpdatePaymentStatus {
        installment_id: Uuid,
        status: InstallmentStatus,
        /// Resolved by the command handler from the client's order
        /// history before the aggregate runs; None when the update
        /// cannot trigger revenue-share creation.
        revenue_terms: Option<RevenueTerms>,
        actor: Actor,
    },
    AddDeliveryItem {
        description: String,
        is_final: bool,
        actor: Actor,
    },
    MarkDelivered {
        delivery_id: Uuid,
        actor: Actor,
    },
    RequestDeliveryModification {
        delivery_id: Uuid,
        comment: String,
        actor: Actor,
    },
    AcceptDelivery {
        delivery_id: Uuid,
        is_final: bool,
        actor: Actor,
    },
    UpdateOrderStatus {
        status: OrderStatus,
        reason: Option<String>,
        actor: Actor,
    },
    CancelOrder {
        reason: Option<String>,
        actor: Actor,
    },
    CompleteOrder {
        actor: Actor,
    },
    MarkRevenueSharePaid {
        actor: Actor,
    },
}

impl OrderCommand {
    pub fn actor(&self) -> Actor {
        match self {
            OrderCommand::CreateFromTemplate { actor, .. }
            | OrderCommand::ResolveBlock { actor, .. }
            | OrderCommand::RequestQuote { actor }
            | OrderCommand::SendQuote { actor, .. }
            | OrderCommand::AcceptQuote { actor }
            | OrderCommand::RejectQuote { actor }
            | OrderCommand::SignContract { actor, .. }
            | OrderCommand::RequestContractChange { actor, .. }
            | OrderCommand::ApproveContractChange { actor, .. }
            | OrderCommand::RejectContractChange { actor, .. }
            | OrderCommand::UpdatePaymentStatus { actor, .. }
            | OrderCommand::AddDeliveryItem { actor, .. }
            | OrderCommand::MarkDelivered { actor, .. }
            | OrderCommand::RequestDeliveryModification { actor, .. }
            | OrderCommand::AcceptDelivery { actor, .. }
            | OrderCommand::UpdateOrderStatus { actor, .. }
            | OrderCommand::CancelOrder { actor, .. }
            | OrderCommand::CompleteOrder { actor }
            | OrderCommand::MarkRevenueSharePaid { actor } => *actor,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::CreateFromTemplate { .. } => "CreateFromTemplate",
            OrderCommand::ResolveBlock { .. } => "ResolveBlock",
            OrderCommand::RequestQuote { .. } => "RequestQuote",
            OrderCommand::SendQuote { .. } => "SendQuote",
            OrderCommand::AcceptQuote { .. } => "AcceptQuote",
            OrderCommand::RejectQuote { .. } => "RejectQuote",
            OrderCommand::SignContract { .. } => "SignContract",
            OrderCommand::RequestContractChange { .. } => "RequestContractChange",
            OrderCommand::ApproveContractChange { .. } => "ApproveContractChange",
            OrderCommand::RejectContractChange { .. } => "RejectContractChange",
            OrderCommand::UpdatePaymentStatus { .. } => "UpdatePaymentStatus",
            OrderCommand::AddDeliveryItem { .. } => "AddDeliveryItem",
            OrderCommand::MarkDelivered { .. } => "MarkDelivered",
            OrderCommand::RequestDeliveryModification { .. } => "RequestDeliveryModification",
            OrderCommand::AcceptDelivery { .. } => "AcceptDelivery",
            OrderCommand::UpdateOrderStatus { .. } => "UpdateOrderStatus",
            OrderCommand::CancelOrder { .. } => "CancelOrder",
            OrderCommand::CompleteOrder { .. } => "CompleteOrder",
            OrderCommand::MarkRevenueSharePaid { .. } => "MarkRevenueSharePaid",
        }
    }
}
