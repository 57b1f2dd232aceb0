// ============================================================================
// Event Sourcing Store - Persistence Layer
// ============================================================================
//
// Generic Postgres-backed persistence for event streams. Works with any
// aggregate/event type.
//
// ============================================================================

pub mod event_store;

pub use event_store::{ConcurrencyConflict, EventStore};
