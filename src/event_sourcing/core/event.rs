use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Event Envelope - Persisted Event Metadata
// ============================================================================
//
// Wraps a domain event with the bookkeeping the store needs: identity,
// ordering, type tag, and who triggered it. Generic over the event type;
// nothing in here knows about orders.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    /// Position in the aggregate's stream, starting at 1.
    pub sequence_number: i64,

    /// Concrete event name, e.g. "QuoteSent". Used for auditing and for
    /// schema evolution; deserialization itself is driven by serde tags.
    pub event_type: String,
    pub event_version: i32,

    pub event_data: E,

    /// Groups the events of one command execution.
    pub correlation_id: Uuid,
    /// The acting user, when a user (rather than the system) caused this.
    pub user_id: Option<Uuid>,

    pub timestamp: DateTime<Utc>,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        aggregate_id: Uuid,
        sequence_number: i64,
        event_type: String,
        event_data: E,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            sequence_number,
            event_type,
            event_version: 1,
            event_data,
            correlation_id,
            user_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

/// Marker for event types the store can persist.
pub trait DomainEvent: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync {
    fn event_type() -> &'static str
    where
        Self: Sized;

    fn event_version() -> i32
    where
        Self: Sized,
    {
        1
    }
}

pub fn serialize_event<E: Serialize>(event: &E) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

pub fn deserialize_event<E: for<'de> Deserialize<'de>>(json: &str) -> Result<E> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    struct TestEvent {
        data: String,
    }

    impl DomainEvent for TestEvent {
        fn event_type() -> &'static str {
            "TestEvent"
        }
    }

    #[test]
    fn envelope_carries_stream_position() {
        let aggregate_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let envelope = EventEnvelope::new(
            aggregate_id,
            3,
            TestEvent::event_type().to_string(),
            TestEvent { data: "x".into() },
            correlation_id,
        );

        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.sequence_number, 3);
        assert_eq!(envelope.event_type, "TestEvent");
        assert_eq!(envelope.correlation_id, correlation_id);
        assert!(envelope.user_id.is_none());
    }

    #[test]
    fn serialization_round_trips() {
        let event = TestEvent { data: "payload".into() };
        let json = serialize_event(&event).unwrap();
        let back: TestEvent = deserialize_event(&json).unwrap();
        assert_eq!(event, back);
    }
}
