use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::template::ServiceTemplate;
use crate::event_sourcing::core::Aggregate;

use super::commands::OrderCommand;
use super::contract::{self, Contract, ContractStatus};
use super::delivery::{DeliveryItem, DeliveryStatus};
use super::errors::OrderError;
use super::events::*;
use super::installments::{self, InstallmentStatus, PaymentInstallment, PaymentPlan};
use super::pricing;
use super::revenue::{self, RevenueShare, RevenueShareStatus};
use super::value_objects::{
    Actor, BlockBody, BlockResolution, ConfirmationBlock, OrderStatus, Role,
};

// ============================================================================
// Order Aggregate - Negotiation, Signing, Payment, Delivery
// ============================================================================
//
// The top-level state machine. Commands are validated against the current
// status and the actor's role before any event is emitted; a failed
// command emits nothing, so partial application is never observable.
// Cross-entity effects (both parties signed => installments + deliveries
// exist; first payment => revenue share) are events emitted by the same
// command and therefore commit atomically with it.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAggregate {
    // Identity
    pub id: Uuid,
    pub version: i64,
    pub order_number: String,

    // Parties
    pub client_id: Uuid,
    pub provider_id: Uuid,

    // Current state (derived from events)
    pub status: OrderStatus,
    pub total_price: Decimal,
    /// Template snapshot taken at creation; later template edits never
    /// reach this order.
    pub template: ServiceTemplate,
    pub blocks: Vec<ConfirmationBlock>,
    pub contracts: Vec<Contract>,
    pub installments: Vec<PaymentInstallment>,
    pub deliveries: Vec<DeliveryItem>,
    pub revenue_share: Option<RevenueShare>,
    pub cancelled_reason: Option<String>,

    // Audit trail
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderAggregate {
    /// Plan the creation events for a brand-new order. Everything else
    /// goes through [`Aggregate::handle_command`] on an existing one.
    pub fn plan_creation(command: &OrderCommand) -> Result<Vec<OrderEvent>, OrderError> {
        let OrderCommand::CreateFromTemplate {
            order_id,
            order_number,
            client_id,
            provider_id,
            template,
            actor,
        } = command
        else {
            return Err(OrderError::NotInitialized);
        };

        match actor.role {
            Role::Client if actor.user_id == *client_id => {}
            Role::Operator => {}
            _ => {
                return Err(OrderError::Forbidden {
                    role: actor.role,
                    action: "create an order for this client",
                })
            }
        }

        if template.starting_price < Decimal::ZERO {
            return Err(OrderError::Validation(format!(
                "template starting price must be non-negative, got {}",
                template.starting_price
            )));
        }
        if order_number.trim().is_empty() {
            return Err(OrderError::Validation("order number must not be empty".into()));
        }

        // Copy-on-create: blocks are never shared with the template.
        let blocks: Vec<ConfirmationBlock> =
            template.blocks.iter().map(ConfirmationBlock::deep_copy).collect();
        let total_price = pricing::running_price(template, &blocks);

        Ok(vec![OrderEvent::Created(OrderCreated {
            order_id: *order_id,
            order_number: order_number.clone(),
            client_id: *client_id,
            provider_id: *provider_id,
            template: template.clone(),
            blocks,
            total_price,
        })])
    }

    // ------------------------------------------------------------------
    // Authorization helpers (explicit actor, no ambient context)
    // ------------------------------------------------------------------

    fn ensure_client(&self, actor: Actor, action: &'static str) -> Result<(), OrderError> {
        if actor.role != Role::Client {
            return Err(OrderError::Forbidden { role: actor.role, action });
        }
        if actor.user_id != self.client_id {
            return Err(OrderError::NotParticipant);
        }
        Ok(())
    }

    fn ensure_provider(&self, actor: Actor, action: &'static str) -> Result<(), OrderError> {
        if actor.role != Role::Provider {
            return Err(OrderError::Forbidden { role: actor.role, action });
        }
        if actor.user_id != self.provider_id {
            return Err(OrderError::NotParticipant);
        }
        Ok(())
    }

    /// Client, provider, or operator; identity checked for the parties.
    fn ensure_party(&self, actor: Actor) -> Result<(), OrderError> {
        match actor.role {
            Role::Client if actor.user_id == self.client_id => Ok(()),
            Role::Provider if actor.user_id == self.provider_id => Ok(()),
            Role::Operator => Ok(()),
            _ => Err(OrderError::NotParticipant),
        }
    }

    fn ensure_status(&self, allowed: &[OrderStatus]) -> Result<(), OrderError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(OrderError::InvalidState { status: self.status })
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn active_contract(&self) -> Option<&Contract> {
        contract::active_contract(&self.contracts)
    }

    fn require_active_contract(&self, contract_id: Uuid) -> Result<&Contract, OrderError> {
        let found = self
            .contracts
            .iter()
            .find(|c| c.id == contract_id)
            .ok_or(OrderError::NotFound { entity: "contract", id: contract_id })?;
        if found.status != ContractStatus::Active {
            return Err(OrderError::Validation(
                "contract is no longer active".into(),
            ));
        }
        Ok(found)
    }

    fn require_installment(&self, id: Uuid) -> Result<&PaymentInstallment, OrderError> {
        self.installments
            .iter()
            .find(|i| i.id == id)
            .ok_or(OrderError::NotFound { entity: "installment", id })
    }

    fn require_delivery(&self, id: Uuid) -> Result<&DeliveryItem, OrderError> {
        self.deliveries
            .iter()
            .find(|d| d.id == id)
            .ok_or(OrderError::NotFound { entity: "delivery item", id })
    }

    fn next_contract_number(&self) -> String {
        format!("{}-C{}", self.order_number, self.contracts.len() + 1)
    }

    fn status_change(&self, to: OrderStatus, reason: Option<String>, by: Actor) -> OrderEvent {
        OrderEvent::StatusChanged(StatusChanged {
            from: self.status,
            to,
            reason,
            by: Some(by),
        })
    }

    // ------------------------------------------------------------------
    // Command handlers
    // ------------------------------------------------------------------

    fn handle_resolve_block(
        &self,
        block_id: Uuid,
        resolution: &BlockResolution,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_client(actor, "resolve a confirmation block")?;
        self.ensure_status(&[OrderStatus::Inquiry])?;

        let block = self
            .blocks
            .iter()
            .find(|b| b.id == block_id)
            .ok_or(OrderError::NotFound { entity: "confirmation block", id: block_id })?;

        // The resolution must match the block's kind.
        match (&block.body, resolution) {
            (BlockBody::List { items }, BlockResolution::SelectItem { item_id, .. }) => {
                if !items.iter().any(|i| i.id == *item_id) {
                    return Err(OrderError::NotFound { entity: "list item", id: *item_id });
                }
            }
            (BlockBody::Payment { .. }, BlockResolution::PaymentPlan(name)) => {
                // Reject unknown plan names at selection time.
                PaymentPlan::parse(name)?;
            }
            (BlockBody::Delivery { .. }, BlockResolution::DeliveryCommitment(text)) => {
                if text.trim().is_empty() {
                    return Err(OrderError::Validation(
                        "delivery commitment must not be empty".into(),
                    ));
                }
            }
            _ => {
                return Err(OrderError::Validation(
                    "resolution does not match the block kind".into(),
                ))
            }
        }

        Ok(vec![OrderEvent::BlockResolved(BlockResolved {
            block_id,
            resolution: resolution.clone(),
        })])
    }

    fn handle_request_quote(&self, actor: Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_client(actor, "request a quote")?;
        self.ensure_status(&[OrderStatus::Inquiry])?;

        if let Some(block) = self.blocks.iter().find(|b| !b.is_resolved()) {
            return Err(OrderError::Validation(format!(
                "confirmation block '{}' is not resolved",
                block.title
            )));
        }

        let contract =
            Contract::from_template(&self.template, &self.blocks, self.next_contract_number())?;

        Ok(vec![
            OrderEvent::QuoteRequested(QuoteRequested { contract }),
            self.status_change(OrderStatus::QuoteRequest, None, actor),
        ])
    }

    fn handle_send_quote(&self, price: Decimal, actor: Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_provider(actor, "send a quote")?;
        self.ensure_status(&[OrderStatus::QuoteRequest])?;
        if price < Decimal::ZERO {
            return Err(OrderError::Validation(format!(
                "quote price must be non-negative, got {price}"
            )));
        }
        let contract = self.active_contract().ok_or(OrderError::NoActiveContract)?;

        Ok(vec![
            OrderEvent::QuoteSent(QuoteSent { contract_id: contract.id, price }),
            self.status_change(OrderStatus::QuoteSent, None, actor),
        ])
    }

    fn handle_accept_quote(&self, actor: Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_client(actor, "accept a quote")?;
        self.ensure_status(&[OrderStatus::QuoteSent])?;
        let contract = self.active_contract().ok_or(OrderError::NoActiveContract)?;

        Ok(vec![
            OrderEvent::QuoteAccepted(QuoteAccepted {
                contract_id: contract.id,
                signed_at: Utc::now(),
            }),
            self.status_change(OrderStatus::QuoteAccept, None, actor),
        ])
    }

    /// Renegotiation: retire the active contract and rebuild a fresh one
    /// from the template, re-applying the confirmation choices.
    fn handle_reject_quote(&self, actor: Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_client(actor, "reject a quote")?;
        self.ensure_status(&[OrderStatus::QuoteSent])?;
        let retired = self.active_contract().ok_or(OrderError::NoActiveContract)?;

        let replacement =
            Contract::from_template(&self.template, &self.blocks, self.next_contract_number())?;

        Ok(vec![
            OrderEvent::QuoteRejected(QuoteRejected {
                retired_contract_id: retired.id,
                contract: replacement,
            }),
            self.status_change(OrderStatus::QuoteRequest, None, actor),
        ])
    }

    fn handle_sign_contract(
        &self,
        contract_id: Uuid,
        signature_url: Option<String>,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match actor.role {
            Role::Client => self.ensure_client(actor, "sign the contract")?,
            Role::Provider => self.ensure_provider(actor, "sign the contract")?,
            Role::Operator => {
                return Err(OrderError::Forbidden {
                    role: actor.role,
                    action: "sign a contract",
                })
            }
        }
        self.ensure_status(&[OrderStatus::QuoteAccept])?;
        let contract = self.require_active_contract(contract_id)?;

        let signed_at = Utc::now();
        let mut simulated = contract.clone();
        simulated.sign(actor.role, signature_url.clone(), signed_at)?;

        let mut events = vec![OrderEvent::ContractSigned(ContractSigned {
            contract_id,
            role: actor.role,
            signed_at,
            signature_url,
        })];

        // The moment both parties have signed, installments and delivery
        // tracking come to life in the same unit of work.
        if simulated.is_fully_signed() {
            let plan_name = simulated.payment_plan_name().ok_or_else(|| {
                OrderError::Configuration("signed contract has no payment block".into())
            })?;
            let plan = PaymentPlan::parse(plan_name)?;
            let installments = installments::plan_installments(
                plan,
                simulated.price,
                &self.template.receiving_account,
            )?;

            let commitment = simulated.delivery_commitment().ok_or_else(|| {
                OrderError::Configuration("signed contract has no delivery block".into())
            })?;
            let items = vec![DeliveryItem::new(commitment.to_string(), true)];

            events.push(OrderEvent::InstallmentsScheduled(InstallmentsScheduled {
                installments,
            }));
            events.push(OrderEvent::DeliveriesInitialized(DeliveriesInitialized { items }));
            events.push(self.status_change(OrderStatus::AwaitingPayment, None, actor));
        }

        Ok(events)
    }

    fn handle_request_contract_change(
        &self,
        contract_id: Uuid,
        reason: &str,
        proposed_text: Option<String>,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_party(actor)?;
        if actor.role == Role::Operator {
            return Err(OrderError::Forbidden {
                role: actor.role,
                action: "request a contract change",
            });
        }
        if !contract::change_request_window(self.status) {
            return Err(OrderError::InvalidState { status: self.status });
        }
        let target = self.require_active_contract(contract_id)?;

        // Validates the reason and the one-pending-request rule.
        let mut simulated = target.clone();
        contract::request_change(&mut simulated, actor.role, reason.to_string(), proposed_text.clone())?;

        Ok(vec![OrderEvent::ContractChangeRequested(ContractChangeRequested {
            contract_id,
            reason: reason.to_string(),
            proposed_text,
            requested_by: actor.role,
            requested_at: Utc::now(),
        })])
    }

    fn handle_resolve_contract_change(
        &self,
        contract_id: Uuid,
        approved: bool,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_party(actor)?;
        if actor.role == Role::Operator {
            return Err(OrderError::Forbidden {
                role: actor.role,
                action: "resolve a contract change request",
            });
        }
        if !contract::change_request_window(self.status) {
            return Err(OrderError::InvalidState { status: self.status });
        }
        let target = self.require_active_contract(contract_id)?;
        contract::ensure_counter_party(target, actor.role)?;

        let mut events = vec![OrderEvent::ContractChangeResolved(ContractChangeResolved {
            contract_id,
            approved,
            resolved_by: actor.role,
        })];

        // Approval settles the order back into the payment phase; a
        // rejection reopens negotiation from the top.
        let reverted = if approved { OrderStatus::AwaitingPayment } else { OrderStatus::Inquiry };
        if self.status != reverted {
            events.push(self.status_change(reverted, None, actor));
        }

        Ok(events)
    }

    fn handle_update_payment_status(
        &self,
        installment_id: Uuid,
        status: InstallmentStatus,
        revenue_terms: Option<&revenue::RevenueTerms>,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match actor.role {
            Role::Client => self.ensure_client(actor, "update a payment")?,
            Role::Operator => {}
            Role::Provider => {
                return Err(OrderError::Forbidden {
                    role: actor.role,
                    action: "update a payment",
                })
            }
        }

        let installment = self.require_installment(installment_id)?;
        match (installment.status, status) {
            (InstallmentStatus::Pending, InstallmentStatus::Paid | InstallmentStatus::Failed) => {}
            (InstallmentStatus::Failed, InstallmentStatus::Pending | InstallmentStatus::Paid) => {}
            (from, to) => {
                return Err(OrderError::Validation(format!(
                    "installment cannot move from {from:?} to {to:?}"
                )))
            }
        }

        let paid_at = (status == InstallmentStatus::Paid).then(Utc::now);
        let mut events = vec![OrderEvent::PaymentStatusUpdated(PaymentStatusUpdated {
            installment_id,
            status,
            paid_at,
        })];

        // First installment paid while the order awaits payment: work
        // starts and the platform books its cut, exactly once.
        let first_payment = status == InstallmentStatus::Paid
            && self.status == OrderStatus::AwaitingPayment
            && !self.installments.iter().any(|i| i.status == InstallmentStatus::Paid);

        if first_payment {
            events.push(self.status_change(OrderStatus::InProgress, None, actor));

            // Settlement bookkeeping must never block the payment itself;
            // failures here are logged for manual reconciliation.
            match revenue_terms {
                Some(terms) => {
                    match revenue::build_record(self.revenue_share.as_ref(), terms, self.total_price)
                    {
                        Ok(record) => {
                            events.push(OrderEvent::RevenueShareRecorded(RevenueShareRecorded {
                                record,
                            }));
                        }
                        Err(e) => {
                            tracing::error!(
                                order_id = %self.id,
                                error = %e,
                                "revenue share creation failed; payment recorded anyway"
                            );
                        }
                    }
                }
                None => {
                    tracing::error!(
                        order_id = %self.id,
                        "no revenue terms resolved for first payment; \
                         settlement needs manual reconciliation"
                    );
                }
            }
        }

        Ok(events)
    }

    fn handle_add_delivery_item(
        &self,
        description: &str,
        is_final: bool,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_provider(actor, "add a delivery item")?;
        self.ensure_status(&[OrderStatus::InProgress, OrderStatus::InRevision])?;
        if description.trim().is_empty() {
            return Err(OrderError::Validation("delivery description must not be empty".into()));
        }

        Ok(vec![OrderEvent::DeliveryItemAdded(DeliveryItemAdded {
            item: DeliveryItem::new(description.to_string(), is_final),
        })])
    }

    fn handle_mark_delivered(
        &self,
        delivery_id: Uuid,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_provider(actor, "mark a delivery")?;
        self.ensure_status(&[OrderStatus::InProgress, OrderStatus::InRevision])?;
        let item = self.require_delivery(delivery_id)?;
        if !item.can_be_delivered() {
            return Err(OrderError::Validation(format!(
                "delivery item cannot be delivered from {:?}",
                item.status
            )));
        }

        Ok(vec![OrderEvent::DeliveryStatusUpdated(DeliveryStatusUpdated {
            delivery_id,
            status: DeliveryStatus::Delivered,
            comment: None,
            is_final: item.is_final,
            at: Utc::now(),
        })])
    }

    fn handle_request_delivery_modification(
        &self,
        delivery_id: Uuid,
        comment: &str,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_client(actor, "request a delivery modification")?;
        self.ensure_status(&[
            OrderStatus::InProgress,
            OrderStatus::Delivered,
            OrderStatus::InRevision,
        ])?;
        if comment.trim().is_empty() {
            return Err(OrderError::Validation(
                "a modification request requires a comment".into(),
            ));
        }
        let item = self.require_delivery(delivery_id)?;
        if item.status != DeliveryStatus::Delivered {
            return Err(OrderError::Validation(format!(
                "only a delivered item can get a modification request, item is {:?}",
                item.status
            )));
        }

        let mut events = vec![OrderEvent::DeliveryStatusUpdated(DeliveryStatusUpdated {
            delivery_id,
            status: DeliveryStatus::ModificationRequested,
            comment: Some(comment.to_string()),
            is_final: item.is_final,
            at: Utc::now(),
        })];

        if self.status == OrderStatus::Delivered {
            events.push(self.status_change(OrderStatus::InRevision, None, actor));
        }

        Ok(events)
    }

    fn handle_accept_delivery(
        &self,
        delivery_id: Uuid,
        mark_final: bool,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_client(actor, "accept a delivery")?;
        self.ensure_status(&[
            OrderStatus::InProgress,
            OrderStatus::Delivered,
            OrderStatus::InRevision,
        ])?;
        let item = self.require_delivery(delivery_id)?;
        if item.status != DeliveryStatus::Delivered {
            return Err(OrderError::Validation(format!(
                "only a delivered item can be accepted, item is {:?}",
                item.status
            )));
        }

        let is_final = item.is_final || mark_final;
        let mut events = vec![OrderEvent::DeliveryStatusUpdated(DeliveryStatusUpdated {
            delivery_id,
            status: DeliveryStatus::Accepted,
            comment: None,
            is_final,
            at: Utc::now(),
        })];

        // Accepting the final deliverable closes the delivery phase. The
        // transition table forbids InRevision -> Delivered, so from a
        // revision round the order completes directly.
        if is_final {
            match self.status {
                OrderStatus::InProgress => {
                    events.push(self.status_change(OrderStatus::Delivered, None, actor));
                }
                OrderStatus::InRevision => {
                    events.push(self.status_change(OrderStatus::Completed, None, actor));
                }
                _ => {}
            }
        }

        Ok(events)
    }

    fn handle_update_order_status(
        &self,
        target: OrderStatus,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_party(actor)?;

        // Sanctioned operator override outside the normal table.
        let override_to_completed = actor.role == Role::Operator
            && self.status == OrderStatus::Inquiry
            && target == OrderStatus::Completed;

        if !override_to_completed && !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidTransition { from: self.status, to: target });
        }

        Ok(vec![self.status_change(target, reason, actor)])
    }

    fn handle_cancel(&self, reason: Option<String>, actor: Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_party(actor)?;
        if self.status.is_terminal() {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }
        Ok(vec![self.status_change(OrderStatus::Cancelled, reason, actor)])
    }

    fn handle_complete(&self, actor: Actor) -> Result<Vec<OrderEvent>, OrderError> {
        self.ensure_client(actor, "complete the order")?;
        if self.status != OrderStatus::Delivered {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: OrderStatus::Completed,
            });
        }
        Ok(vec![self.status_change(OrderStatus::Completed, None, actor)])
    }

    fn handle_mark_revenue_share_paid(&self, actor: Actor) -> Result<Vec<OrderEvent>, OrderError> {
        if actor.role != Role::Operator {
            return Err(OrderError::Forbidden {
                role: actor.role,
                action: "settle the revenue share",
            });
        }
        let record = self
            .revenue_share
            .as_ref()
            .ok_or(OrderError::NotFound { entity: "revenue share", id: self.id })?;
        if record.status != RevenueShareStatus::Unpaid {
            return Err(OrderError::Validation("revenue share is already settled".into()));
        }

        Ok(vec![OrderEvent::RevenueShareStatusUpdated(RevenueShareStatusUpdated {
            status: RevenueShareStatus::Paid,
        })])
    }

    // ------------------------------------------------------------------
    // Event application helpers
    // ------------------------------------------------------------------

    fn apply_block_resolution(&mut self, e: &BlockResolved) -> Result<(), OrderError> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == e.block_id)
            .ok_or(OrderError::NotFound { entity: "confirmation block", id: e.block_id })?;

        match (&mut block.body, &e.resolution) {
            (BlockBody::List { items }, BlockResolution::SelectItem { item_id, selected }) => {
                if let Some(item) = items.iter_mut().find(|i| i.id == *item_id) {
                    item.selected = *selected;
                }
            }
            (BlockBody::Payment { plan }, BlockResolution::PaymentPlan(name)) => {
                *plan = Some(name.clone());
            }
            (BlockBody::Delivery { commitment }, BlockResolution::DeliveryCommitment(text)) => {
                *commitment = Some(text.clone());
            }
            _ => {}
        }

        // Negotiation price follows the selections.
        self.total_price = pricing::running_price(&self.template, &self.blocks);
        Ok(())
    }

    fn apply_delivery_status(&mut self, e: &DeliveryStatusUpdated) -> Result<(), OrderError> {
        let item = self
            .deliveries
            .iter_mut()
            .find(|d| d.id == e.delivery_id)
            .ok_or(OrderError::NotFound { entity: "delivery item", id: e.delivery_id })?;

        item.status = e.status;
        item.is_final = e.is_final;
        if e.comment.is_some() {
            item.comment = e.comment.clone();
        }
        match e.status {
            DeliveryStatus::Delivered => item.delivered_at = Some(e.at),
            DeliveryStatus::Accepted => item.accepted_at = Some(e.at),
            _ => {}
        }
        Ok(())
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for OrderAggregate {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            OrderEvent::Created(e) => {
                let now = Utc::now();
                Ok(Self {
                    id: e.order_id,
                    version: 1,
                    order_number: e.order_number.clone(),
                    client_id: e.client_id,
                    provider_id: e.provider_id,
                    status: OrderStatus::Inquiry,
                    total_price: e.total_price,
                    template: e.template.clone(),
                    blocks: e.blocks.clone(),
                    contracts: Vec::new(),
                    installments: Vec::new(),
                    deliveries: Vec::new(),
                    revenue_share: None,
                    cancelled_reason: None,
                    created_at: now,
                    updated_at: now,
                })
            }
            _ => Err(OrderError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        self.version += 1;
        self.updated_at = Utc::now();

        match event {
            OrderEvent::Created(_) => Ok(()),
            OrderEvent::BlockResolved(e) => self.apply_block_resolution(e),
            OrderEvent::QuoteRequested(e) => {
                contract::retire_active(&mut self.contracts);
                self.contracts.push(e.contract.clone());
                Ok(())
            }
            OrderEvent::QuoteSent(e) => {
                if let Some(c) = contract::active_contract_mut(&mut self.contracts) {
                    c.price = e.price;
                }
                Ok(())
            }
            OrderEvent::QuoteAccepted(e) => {
                if let Some(c) = self.contracts.iter_mut().find(|c| c.id == e.contract_id) {
                    c.client_signed = true;
                    c.client_signed_at = Some(e.signed_at);
                    self.total_price = c.price;
                }
                Ok(())
            }
            OrderEvent::QuoteRejected(e) => {
                contract::retire_active(&mut self.contracts);
                self.contracts.push(e.contract.clone());
                Ok(())
            }
            OrderEvent::ContractSigned(e) => {
                let contract = self
                    .contracts
                    .iter_mut()
                    .find(|c| c.id == e.contract_id)
                    .ok_or(OrderError::NotFound { entity: "contract", id: e.contract_id })?;
                contract.sign(e.role, e.signature_url.clone(), e.signed_at)?;
                Ok(())
            }
            OrderEvent::InstallmentsScheduled(e) => {
                self.installments = e.installments.clone();
                Ok(())
            }
            OrderEvent::DeliveriesInitialized(e) => {
                self.deliveries = e.items.clone();
                Ok(())
            }
            OrderEvent::ContractChangeRequested(e) => {
                if let Some(c) = self.contracts.iter_mut().find(|c| c.id == e.contract_id) {
                    c.change_request = Some(contract::ChangeRequest {
                        reason: e.reason.clone(),
                        proposed_text: e.proposed_text.clone(),
                        requested_by: e.requested_by,
                        requested_at: e.requested_at,
                    });
                }
                Ok(())
            }
            OrderEvent::ContractChangeResolved(e) => {
                if let Some(c) = self.contracts.iter_mut().find(|c| c.id == e.contract_id) {
                    c.change_request = None;
                }
                Ok(())
            }
            OrderEvent::PaymentStatusUpdated(e) => {
                let installment = self
                    .installments
                    .iter_mut()
                    .find(|i| i.id == e.installment_id)
                    .ok_or(OrderError::NotFound {
                        entity: "installment",
                        id: e.installment_id,
                    })?;
                installment.status = e.status;
                installment.paid_at = e.paid_at;
                Ok(())
            }
            OrderEvent::RevenueShareRecorded(e) => {
                if self.revenue_share.is_none() {
                    self.revenue_share = Some(e.record.clone());
                }
                Ok(())
            }
            OrderEvent::RevenueShareStatusUpdated(e) => {
                if let Some(record) = self.revenue_share.as_mut() {
                    record.status = e.status;
                }
                Ok(())
            }
            OrderEvent::DeliveryItemAdded(e) => {
                self.deliveries.push(e.item.clone());
                Ok(())
            }
            OrderEvent::DeliveryStatusUpdated(e) => self.apply_delivery_status(e),
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
                if e.to == OrderStatus::Cancelled {
                    self.cancelled_reason = e.reason.clone();
                }
                Ok(())
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::CreateFromTemplate { .. } => Err(OrderError::AlreadyInitialized),
            OrderCommand::ResolveBlock { block_id, resolution, actor } => {
                self.handle_resolve_block(*block_id, resolution, *actor)
            }
            OrderCommand::RequestQuote { actor } => self.handle_request_quote(*actor),
            OrderCommand::SendQuote { price, actor } => self.handle_send_quote(*price, *actor),
            OrderCommand::AcceptQuote { actor } => self.handle_accept_quote(*actor),
            OrderCommand::RejectQuote { actor } => self.handle_reject_quote(*actor),
            OrderCommand::SignContract { contract_id, signature_url, actor } => {
                self.handle_sign_contract(*contract_id, signature_url.clone(), *actor)
            }
            OrderCommand::RequestContractChange { contract_id, reason, proposed_text, actor } => {
                self.handle_request_contract_change(
                    *contract_id,
                    reason,
                    proposed_text.clone(),
                    *actor,
                )
            }
            OrderCommand::ApproveContractChange { contract_id, actor } => {
                self.handle_resolve_contract_change(*contract_id, true, *actor)
            }
            OrderCommand::RejectContractChange { contract_id, actor } => {
                self.handle_resolve_contract_change(*contract_id, false, *actor)
            }
            OrderCommand::UpdatePaymentStatus { installment_id, status, revenue_terms, actor } => {
                self.handle_update_payment_status(
                    *installment_id,
                    *status,
                    revenue_terms.as_ref(),
                    *actor,
                )
            }
            OrderCommand::AddDeliveryItem { description, is_final, actor } => {
                self.handle_add_delivery_item(description, *is_final, *actor)
            }
            OrderCommand::MarkDelivered { delivery_id, actor } => {
                self.handle_mark_delivered(*delivery_id, *actor)
            }
            OrderCommand::RequestDeliveryModification { delivery_id, comment, actor } => {
                self.handle_request_delivery_modification(*delivery_id, comment, *actor)
            }
            OrderCommand::AcceptDelivery { delivery_id, is_final, actor } => {
                self.handle_accept_delivery(*delivery_id, *is_final, *actor)
            }
            OrderCommand::UpdateOrderStatus { status, reason, actor } => {
                self.handle_update_order_status(*status, reason.clone(), *actor)
            }
            OrderCommand::CancelOrder { reason, actor } => {
                self.handle_cancel(reason.clone(), *actor)
            }
            OrderCommand::CompleteOrder { actor } => self.handle_complete(*actor),
            OrderCommand::MarkRevenueSharePaid { actor } => {
                self.handle_mark_revenue_share_paid(*actor)
            }
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
