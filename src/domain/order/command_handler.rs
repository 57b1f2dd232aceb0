use std::sync::Arc;

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::event_sourcing::core::{Aggregate, EventEnvelope};
use crate::event_sourcing::store::{ConcurrencyConflict, EventStore};
use crate::store::projection;
use crate::utils::{retry_on_transient, IsTransient, RetryConfig};

use super::aggregate::OrderAggregate;
use super::commands::OrderCommand;
use super::events::OrderEvent;
use super::installments::InstallmentStatus;
use super::revenue::RevenueTerms;

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Orchestrates: Command -> Aggregate -> Events -> Event Store + Projection.
//
// The handler owns the two concerns the aggregate cannot: resolving the
// revenue terms from the client's order history before a payment runs,
// and committing the appended events together with the read-model write
// in one transaction.
//
// ============================================================================

pub struct OrderCommandHandler {
    event_store: Arc<EventStore<OrderEvent>>,
}

/// Version conflicts are worth a reload-and-retry; everything else
/// (validation, authorization, bad state) is final.
impl IsTransient for anyhow::Error {
    fn is_transient(&self) -> bool {
        self.downcast_ref::<ConcurrencyConflict>().is_some()
    }
}

impl OrderCommandHandler {
    pub fn new(event_store: Arc<EventStore<OrderEvent>>) -> Self {
        Self { event_store }
    }

    /// Handle a command and persist the resulting events. Returns the
    /// aggregate state after the command.
    pub async fn handle(
        &self,
        aggregate_id: Uuid,
        command: OrderCommand,
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        let actor = command.actor();
        let command_name = command.name();

        let (aggregate, expected_version, events) = match command {
            creation @ OrderCommand::CreateFromTemplate { .. } => {
                if self.event_store.aggregate_exists(aggregate_id).await? {
                    bail!("order already exists: {}", aggregate_id);
                }
                let events =
                    OrderAggregate::plan_creation(&creation).map_err(anyhow::Error::new)?;
                let mut aggregate =
                    OrderAggregate::apply_first_event(&events[0]).map_err(anyhow::Error::new)?;
                for event in events.iter().skip(1) {
                    aggregate.apply_event(event).map_err(anyhow::Error::new)?;
                }
                (aggregate, 0, events)
            }
            mut command => {
                let mut aggregate: OrderAggregate =
                    self.event_store.load_aggregate(aggregate_id).await?;
                let expected_version = aggregate.version();

                // A first successful payment may create the revenue
                // share, which needs the client's repeat-business terms.
                if let OrderCommand::UpdatePaymentStatus {
                    status: InstallmentStatus::Paid,
                    revenue_terms: terms @ None,
                    ..
                } = &mut command
                {
                    *terms = Some(self.resolve_revenue_terms(&aggregate).await?);
                }

                let events =
                    aggregate.handle_command(&command).map_err(anyhow::Error::new)?;
                for event in &events {
                    aggregate.apply_event(event).map_err(anyhow::Error::new)?;
                }
                (aggregate, expected_version, events)
            }
        };

        let mut envelopes = Vec::with_capacity(events.len());
        let mut sequence = expected_version;
        for event in events {
            sequence += 1;
            envelopes.push(
                EventEnvelope::new(
                    aggregate_id,
                    sequence,
                    event.name().to_string(),
                    event,
                    correlation_id,
                )
                .with_user(actor.user_id),
            );
        }

        // Events and read model commit or roll back together.
        let mut tx = self.event_store.pool().begin().await?;
        self.event_store
            .append_events(&mut tx, aggregate_id, expected_version, &envelopes)
            .await?;
        projection::upsert_order(&mut tx, &aggregate).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %aggregate_id,
            command = command_name,
            status = aggregate.status.as_str(),
            version = aggregate.version(),
            "command handled"
        );
        Ok(aggregate)
    }

    /// [`handle`], retried on optimistic-concurrency conflicts.
    ///
    /// [`handle`]: OrderCommandHandler::handle
    pub async fn handle_with_retry(
        &self,
        aggregate_id: Uuid,
        command: OrderCommand,
        correlation_id: Uuid,
    ) -> Result<OrderAggregate> {
        retry_on_transient(RetryConfig::default(), |_attempt| {
            let command = command.clone();
            async move { self.handle(aggregate_id, command, correlation_id).await }
        })
        .await
        .into_result()
    }

    async fn resolve_revenue_terms(&self, aggregate: &OrderAggregate) -> Result<RevenueTerms> {
        let prior_orders = projection::prior_order_count(
            self.event_store.pool(),
            aggregate.client_id,
            aggregate.template.industry_id,
            aggregate.id,
        )
        .await?;
        Ok(RevenueTerms {
            base_rate: aggregate.template.industry_base_rate,
            prior_orders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_version_conflicts_are_retried() {
        let conflict: anyhow::Error = ConcurrencyConflict {
            aggregate_id: Uuid::new_v4(),
            expected: 2,
            found: 3,
        }
        .into();
        assert!(conflict.is_transient());

        let validation = anyhow::anyhow!("quote price must be non-negative");
        assert!(!validation.is_transient());
    }
}
