use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::value_objects::{BlockBody, ConfirmationBlock, OrderStatus, Role};
use crate::domain::template::ServiceTemplate;

// ============================================================================
// Contract Negotiation Manager
// ============================================================================
//
// Contracts are versioned snapshots built from the template's contract
// blocks. Building one is a deep copy with explicit exclusions: fresh
// identity, no template linkage, no signature state. Two blocks the
// template never had are synthesized from the client's confirmation
// choices: the chosen payment plan and the delivery commitment.
//
// The single-active invariant is owned here: the aggregate only ever
// retires and creates contracts through this module, and superseded
// contracts are kept Inactive for audit, never deleted.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Active,
    Inactive,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Inactive => "inactive",
        }
    }
}

/// A pending change to the active contract; only the counter-party of
/// `requested_by` may resolve it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub reason: String,
    pub proposed_text: Option<String>,
    pub requested_by: Role,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub contract_number: String,
    pub price: Decimal,
    pub status: ContractStatus,
    pub blocks: Vec<ConfirmationBlock>,
    pub client_signed: bool,
    pub client_signed_at: Option<DateTime<Utc>>,
    pub client_signature_url: Option<String>,
    pub provider_signed: bool,
    pub provider_signed_at: Option<DateTime<Utc>>,
    pub provider_signature_url: Option<String>,
    pub change_request: Option<ChangeRequest>,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    /// Build a fresh Active contract from the template, reflecting the
    /// client's confirmation choices.
    ///
    /// The template's contract blocks are copied by value with fresh
    /// identities; signature state and change requests start empty
    /// regardless of anything the caller holds. The synthesized payment
    /// block carries the chosen plan name, the delivery block the
    /// client's first-delivery commitment.
    pub fn from_template(
        template: &ServiceTemplate,
        confirmation_blocks: &[ConfirmationBlock],
        contract_number: String,
    ) -> Result<Self, OrderError> {
        let chosen_plan = chosen_payment_plan(confirmation_blocks).ok_or_else(|| {
            OrderError::Validation("no payment plan selected in confirmation blocks".into())
        })?;
        let commitment = delivery_commitment(confirmation_blocks).ok_or_else(|| {
            OrderError::Validation("no delivery commitment in confirmation blocks".into())
        })?;

        let mut blocks: Vec<ConfirmationBlock> = template
            .contract_blocks
            .iter()
            .map(ConfirmationBlock::deep_copy)
            .collect();

        blocks.push(ConfirmationBlock {
            id: Uuid::new_v4(),
            title: "Payment plan".into(),
            body: BlockBody::Payment { plan: Some(chosen_plan) },
        });
        blocks.push(ConfirmationBlock {
            id: Uuid::new_v4(),
            title: "Delivery".into(),
            body: BlockBody::Delivery { commitment: Some(commitment) },
        });

        Ok(Self {
            id: Uuid::new_v4(),
            contract_number,
            price: Decimal::ZERO,
            status: ContractStatus::Active,
            blocks,
            client_signed: false,
            client_signed_at: None,
            client_signature_url: None,
            provider_signed: false,
            provider_signed_at: None,
            provider_signature_url: None,
            change_request: None,
            created_at: Utc::now(),
        })
    }

    pub fn is_fully_signed(&self) -> bool {
        self.client_signed && self.provider_signed
    }

    /// Record one party's signature. Signing twice is a state error.
    pub fn sign(
        &mut self,
        role: Role,
        signature_url: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        match role {
            Role::Client => {
                if self.client_signed {
                    return Err(OrderError::Validation("client already signed".into()));
                }
                self.client_signed = true;
                self.client_signed_at = Some(at);
                self.client_signature_url = signature_url;
            }
            Role::Provider => {
                if self.provider_signed {
                    return Err(OrderError::Validation("provider already signed".into()));
                }
                self.provider_signed = true;
                self.provider_signed_at = Some(at);
                self.provider_signature_url = signature_url;
            }
            Role::Operator => {
                return Err(OrderError::Forbidden { role, action: "sign a contract" });
            }
        }
        Ok(())
    }

    /// The payment plan name the synthesized payment block carries.
    pub fn payment_plan_name(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match &b.body {
            BlockBody::Payment { plan } => plan.as_deref(),
            _ => None,
        })
    }

    /// The delivery commitment the synthesized delivery block carries.
    pub fn delivery_commitment(&self) -> Option<&str> {
        self.blocks.iter().find_map(|b| match &b.body {
            BlockBody::Delivery { commitment } => commitment.as_deref(),
            _ => None,
        })
    }
}

fn chosen_payment_plan(blocks: &[ConfirmationBlock]) -> Option<String> {
    blocks.iter().find_map(|b| match &b.body {
        BlockBody::Payment { plan } => plan.clone(),
        _ => None,
    })
}

fn delivery_commitment(blocks: &[ConfirmationBlock]) -> Option<String> {
    blocks.iter().find_map(|b| match &b.body {
        BlockBody::Delivery { commitment } => commitment.clone(),
        _ => None,
    })
}

// ============================================================================
// Contract List Helpers (single-active invariant)
// ============================================================================

pub fn active_contract(contracts: &[Contract]) -> Option<&Contract> {
    contracts.iter().find(|c| c.status == ContractStatus::Active)
}

pub fn active_contract_mut(contracts: &mut [Contract]) -> Option<&mut Contract> {
    contracts.iter_mut().find(|c| c.status == ContractStatus::Active)
}

/// Retire every Active contract. Called right before a replacement is
/// appended so at most one contract is ever Active.
pub fn retire_active(contracts: &mut [Contract]) {
    for contract in contracts.iter_mut() {
        if contract.status == ContractStatus::Active {
            contract.status = ContractStatus::Inactive;
        }
    }
}

// ============================================================================
// Change-Request Sub-Protocol
// ============================================================================

/// Statuses during which either party may open or resolve a change
/// request on the active contract.
pub fn change_request_window(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Inquiry | OrderStatus::AwaitingPayment)
}

/// Attach a change request. One pending request at a time.
pub fn request_change(
    contract: &mut Contract,
    requested_by: Role,
    reason: String,
    proposed_text: Option<String>,
) -> Result<(), OrderError> {
    if reason.trim().is_empty() {
        return Err(OrderError::Validation("change reason must not be empty".into()));
    }
    if contract.change_request.is_some() {
        return Err(OrderError::Validation(
            "a change request is already pending on this contract".into(),
        ));
    }
    contract.change_request = Some(ChangeRequest {
        reason,
        proposed_text,
        requested_by,
        requested_at: Utc::now(),
    });
    Ok(())
}

/// Only the counter-party may resolve a request; the requester cannot
/// approve (or reject) their own.
pub fn ensure_counter_party(contract: &Contract, resolver: Role) -> Result<(), OrderError> {
    let request = contract
        .change_request
        .as_ref()
        .ok_or_else(|| OrderError::Validation("no pending change request".into()))?;

    if request.requested_by == resolver {
        return Err(OrderError::Forbidden {
            role: resolver,
            action: "resolve their own change request",
        });
    }
    Ok(())
}

// ============================================================================
// Unit Tests
// ============================================================================
