use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Order lifecycle status.
///
/// The allowed transitions live in [`OrderStatus::transitions`]; every
/// status change in the aggregate is validated against that table, with
/// the single operator-only Inquiry -> Completed override handled in the
/// command layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Inquiry,
    QuoteRequest,
    QuoteSent,
    QuoteAccept,
    AwaitingPayment,
    InProgress,
    Delivered,
    InRevision,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Allowed targets from this status.
    pub fn transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Inquiry => &[QuoteRequest, Cancelled],
            QuoteRequest => &[QuoteSent, Cancelled],
            QuoteSent => &[QuoteAccept, QuoteRequest, Cancelled],
            QuoteAccept => &[AwaitingPayment, Cancelled],
            AwaitingPayment => &[InProgress, Cancelled],
            InProgress => &[Delivered, Cancelled],
            Delivered => &[InRevision, Completed, Cancelled],
            InRevision => &[Completed, Cancelled],
            Completed => &[],
            Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Inquiry => "inquiry",
            OrderStatus::QuoteRequest => "quote_request",
            OrderStatus::QuoteSent => "quote_sent",
            OrderStatus::QuoteAccept => "quote_accept",
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::InRevision => "in_revision",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn all() -> &'static [OrderStatus] {
        use OrderStatus::*;
        &[
            Inquiry,
            QuoteRequest,
            QuoteSent,
            QuoteAccept,
            AwaitingPayment,
            InProgress,
            Delivered,
            InRevision,
            Completed,
            Cancelled,
        ]
    }
}

// ============================================================================
// Actor - Explicit Identity & Role
// ============================================================================

/// The acting user, passed explicitly into every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Client,
    Provider,
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Provider => "provider",
            Role::Operator => "operator",
        }
    }
}

// ============================================================================
// Confirmation Blocks - Negotiation Line Items
// ============================================================================

/// A negotiable block shown to the client before a quote is requested.
///
/// Kind-specific payloads are a tagged variant rather than one record with
/// overloaded content/list fields: a text note, a selectable priced list,
/// a payment-plan choice, or a delivery commitment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationBlock {
    pub id: Uuid,
    pub title: String,
    pub body: BlockBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum BlockBody {
    Text { content: String },
    List { items: Vec<ListItem> },
    Payment { plan: Option<String> },
    Delivery { commitment: Option<String> },
}

impl ConfirmationBlock {
    /// Deep copy with a fresh identity. Selection state is preserved;
    /// ownership is not (the copy belongs to whoever asked for it).
    pub fn deep_copy(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: self.title.clone(),
            body: match &self.body {
                BlockBody::List { items } => BlockBody::List {
                    items: items.iter().map(ListItem::deep_copy).collect(),
                },
                other => other.clone(),
            },
        }
    }

    /// A block is resolved once the client has made the choice it asks
    /// for. Text blocks need no input and are always resolved.
    pub fn is_resolved(&self) -> bool {
        match &self.body {
            BlockBody::Text { .. } => true,
            BlockBody::List { items } => items.iter().any(|i| i.selected),
            BlockBody::Payment { plan } => plan.is_some(),
            BlockBody::Delivery { commitment } => commitment.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    pub id: Uuid,
    pub label: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub selected: bool,
}

impl ListItem {
    pub fn deep_copy(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The client's answer to a single confirmation block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BlockResolution {
    SelectItem { item_id: Uuid, selected: bool },
    PaymentPlan(String),
    DeliveryCommitment(String),
}

// ============================================================================
// Bank Account Snapshot
// ============================================================================

/// Receiving-account details copied (never referenced) into each
/// installment, so later account edits cannot rewrite payment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub bank_name: String,
    pub account_number: String,
    pub holder_name: String,
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn transition_table_matches_lifecycle() {
        use OrderStatus::*;
        assert!(Inquiry.can_transition_to(QuoteRequest));
        assert!(QuoteSent.can_transition_to(QuoteRequest));
        assert!(Delivered.can_transition_to(InRevision));
        assert!(Delivered.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Inquiry));
        assert!(!Inquiry.can_transition_to(Completed));
    }

    #[test]
    fn every_non_terminal_status_can_cancel() {
        for status in OrderStatus::all() {
            if status.is_terminal() {
                assert!(!status.can_transition_to(OrderStatus::Cancelled));
            } else {
                assert!(status.can_transition_to(OrderStatus::Cancelled));
            }
        }
    }

    #[test]
    fn list_block_resolution() {
        let mut block = ConfirmationBlock {
            id: Uuid::new_v4(),
            title: "Options".into(),
            body: BlockBody::List {
                items: vec![ListItem {
                    id: Uuid::new_v4(),
                    label: "Extra revision".into(),
                    quantity: 2,
                    unit_price: dec!(25),
                    selected: false,
                }],
            },
        };
        assert!(!block.is_resolved());

        if let BlockBody::List { items } = &mut block.body {
            items[0].selected = true;
        }
        assert!(block.is_resolved());
    }

    #[test]
    fn text_blocks_are_always_resolved() {
        let block = ConfirmationBlock {
            id: Uuid::new_v4(),
            title: "Notes".into(),
            body: BlockBody::Text {
                content: "Scope of work".into(),
            },
        };
        assert!(block.is_resolved());
    }

    #[test]
    fn deep_copy_gets_fresh_identities() {
        let block = ConfirmationBlock {
            id: Uuid::new_v4(),
            title: "Options".into(),
            body: BlockBody::List {
                items: vec![ListItem {
                    id: Uuid::new_v4(),
                    label: "Rush delivery".into(),
                    quantity: 1,
                    unit_price: dec!(40),
                    selected: true,
                }],
            },
        };

        let copy = block.deep_copy();
        assert_ne!(copy.id, block.id);
        match (&block.body, &copy.body) {
            (BlockBody::List { items: a }, BlockBody::List { items: b }) => {
                assert_ne!(a[0].id, b[0].id);
                assert_eq!(a[0].label, b[0].label);
                assert!(b[0].selected, "selection state survives the copy");
            }
            _ => panic!("expected list bodies"),
        }
    }

    #[test]
    fn line_total_multiplies_quantity() {
        let item = ListItem {
            id: Uuid::new_v4(),
            label: "Seat".into(),
            quantity: 3,
            unit_price: dec!(19.99),
            selected: true,
        };
        assert_eq!(item.line_total(), dec!(59.97));
    }

    #[test]
    fn status_serialization_round_trips() {
        for status in OrderStatus::all() {
            let json = serde_json::to_string(status).unwrap();
            let back: OrderStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(*status, back);
        }
    }
}
