// ============================================================================
// Event Sourcing Infrastructure
// ============================================================================
//
// Generic event sourcing plumbing. Domain-specific code lives in
// src/domain/.
//
// ============================================================================

pub mod core;
pub mod store;

pub use self::core::{Aggregate, DomainEvent, EventEnvelope};
pub use self::store::{ConcurrencyConflict, EventStore};
