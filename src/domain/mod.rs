// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Aggregates and the read-only inputs they consume. Kept strictly apart
// from the event sourcing infrastructure.
//
// ============================================================================

pub mod order;
pub mod template;
