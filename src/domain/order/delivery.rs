use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Delivery Gate
// ============================================================================
//
// Tracks the provider's deliverables. The provider marks an item
// Delivered; the client either accepts it or requests a modification
// (with a mandatory comment). Accepting the item flagged `final` is what
// closes out the delivery phase and flips the order.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    ModificationRequested,
    Accepted,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::ModificationRequested => "modification_requested",
            DeliveryStatus::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryItem {
    pub id: Uuid,
    pub status: DeliveryStatus,
    /// Acceptance of the item carrying this flag closes the order's
    /// delivery phase.
    pub is_final: bool,
    pub description: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl DeliveryItem {
    pub fn new(description: String, is_final: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: DeliveryStatus::Pending,
            is_final,
            description,
            comment: None,
            created_at: Utc::now(),
            delivered_at: None,
            accepted_at: None,
        }
    }

    /// A fresh provider delivery is possible from Pending or after the
    /// client asked for changes.
    pub fn can_be_delivered(&self) -> bool {
        matches!(
            self.status,
            DeliveryStatus::Pending | DeliveryStatus::ModificationRequested
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_starts_pending() {
        let item = DeliveryItem::new("Final logo pack".into(), true);
        assert_eq!(item.status, DeliveryStatus::Pending);
        assert!(item.is_final);
        assert!(item.can_be_delivered());
    }

    #[test]
    fn accepted_item_cannot_be_redelivered() {
        let mut item = DeliveryItem::new("Draft".into(), false);
        item.status = DeliveryStatus::Accepted;
        assert!(!item.can_be_delivered());

        item.status = DeliveryStatus::ModificationRequested;
        assert!(item.can_be_delivered());
    }
}
