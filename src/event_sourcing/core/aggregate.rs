use anyhow::Result;
use uuid::Uuid;

use super::event::EventEnvelope;

// ============================================================================
// Aggregate Root - Event Sourcing Core
// ============================================================================
//
// State is derived from events, never stored directly. A command is
// validated against the current state and either rejected or turned into
// events; applying an event must not fail for any event the aggregate
// itself emitted.
//
// ============================================================================

pub trait Aggregate: Sized + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Create the aggregate from its first event.
    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error>;

    /// Apply a subsequent event to update state.
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Validate a command and emit the events it implies.
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    fn aggregate_id(&self) -> Uuid;

    /// Current version (sequence number of the last applied event).
    fn version(&self) -> i64;

    /// Reconstruct the aggregate from its event history.
    fn load_from_events(events: Vec<EventEnvelope<Self::Event>>) -> Result<Self>
    where
        Self::Error: std::fmt::Display,
    {
        let Some((first, rest)) = events.split_first() else {
            anyhow::bail!("no events to load");
        };

        let mut aggregate = Self::apply_first_event(&first.event_data)
            .map_err(|e| anyhow::anyhow!("failed to apply first event: {}", e))?;

        for envelope in rest {
            aggregate
                .apply_event(&envelope.event_data)
                .map_err(|e| anyhow::anyhow!("failed to apply event: {}", e))?;
        }

        Ok(aggregate)
    }
}
