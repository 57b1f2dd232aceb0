// ============================================================================
// Relational Store - Schema & Read Model
// ============================================================================
//
// The event store is the source of truth; these tables are a projection
// kept in step with it. The command handler writes both inside one
// transaction, so the read model never lags the stream.
//
// ============================================================================

pub mod projection;
pub mod schema;
