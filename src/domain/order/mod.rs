// ============================================================================
// Order Domain - The Engagement Lifecycle
// ============================================================================
//
// Everything order-specific lives here:
// - Value objects (statuses, actors, confirmation blocks)
// - Leaf engines (pricing, installments, revenue, contract, delivery)
// - Events, commands, errors
// - The aggregate and its command handler
//
// The generic event sourcing plumbing is in src/event_sourcing/.
//
// ============================================================================

pub mod aggregate;
pub mod command_handler;
pub mod commands;
pub mod contract;
pub mod delivery;
pub mod errors;
pub mod events;
pub mod installments;
pub mod pricing;
pub mod revenue;
pub mod value_objects;

pub use aggregate::OrderAggregate;
pub use command_handler::OrderCommandHandler;
pub use commands::OrderCommand;
pub use contract::{Contract, ContractStatus};
pub use delivery::{DeliveryItem, DeliveryStatus};
pub use errors::{ErrorKind, OrderError};
pub use events::OrderEvent;
pub use installments::{InstallmentStatus, PaymentInstallment, PaymentPlan};
pub use revenue::{RevenueShare, RevenueShareStatus, RevenueTerms};
pub use value_objects::{
    Actor, BankAccount, BlockBody, BlockResolution, ConfirmationBlock, ListItem, OrderStatus, Role,
};
