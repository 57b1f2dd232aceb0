use std::marker::PhantomData;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::event_sourcing::core::{
    deserialize_event, serialize_event, Aggregate, DomainEvent, EventEnvelope,
};

// ============================================================================
// Generic Event Store
// ============================================================================
//
// Append-only event streams in Postgres, one stream per aggregate.
//
// Two tables:
//   event_store        - the events themselves, keyed by
//                        (aggregate_id, sequence_number)
//   aggregate_sequence - the head version per aggregate, used for
//                        optimistic concurrency
//
// Appending takes an open transaction so the caller can commit the
// events together with whatever read-model writes belong to the same
// unit of work. The head row is locked with FOR UPDATE, so two writers
// racing on one aggregate serialize there and the loser fails the
// version check with [`ConcurrencyConflict`].
//
// ============================================================================

/// Optimistic-lock failure; the caller may reload and retry.
#[derive(Debug, thiserror::Error)]
#[error("concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {found}")]
pub struct ConcurrencyConflict {
    pub aggregate_id: Uuid,
    pub expected: i64,
    pub found: i64,
}

pub struct EventStore<E: DomainEvent> {
    pool: PgPool,
    aggregate_type: String,
    _phantom: PhantomData<E>,
}

impl<E: DomainEvent> EventStore<E> {
    pub fn new(pool: PgPool, aggregate_type: &str) -> Self {
        Self {
            pool,
            aggregate_type: aggregate_type.to_string(),
            _phantom: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Append events inside the caller's transaction. Returns the new
    /// head version.
    pub async fn append_events(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[EventEnvelope<E>],
    ) -> Result<i64> {
        if events.is_empty() {
            bail!("cannot append an empty event list");
        }

        // Lock the head row; concurrent writers serialize here.
        let current_version: i64 = sqlx::query(
            "SELECT current_sequence FROM aggregate_sequence WHERE aggregate_id = $1 FOR UPDATE",
        )
        .bind(aggregate_id)
        .fetch_optional(&mut **tx)
        .await?
        .map(|row| row.get(0))
        .unwrap_or(0);

        if current_version != expected_version {
            return Err(ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                found: current_version,
            }
            .into());
        }

        let mut new_version = expected_version;
        for envelope in events {
            new_version += 1;
            let event_json = serialize_event(&envelope.event_data)?;

            sqlx::query(
                "INSERT INTO event_store (
                    aggregate_id, sequence_number, event_id, event_type, event_version,
                    event_data, correlation_id, user_id, timestamp
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(aggregate_id)
            .bind(new_version)
            .bind(envelope.event_id)
            .bind(&envelope.event_type)
            .bind(envelope.event_version)
            .bind(event_json)
            .bind(envelope.correlation_id)
            .bind(envelope.user_id)
            .bind(envelope.timestamp)
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO aggregate_sequence (aggregate_id, current_sequence, updated_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (aggregate_id)
             DO UPDATE SET current_sequence = EXCLUDED.current_sequence,
                           updated_at = EXCLUDED.updated_at",
        )
        .bind(aggregate_id)
        .bind(new_version)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        tracing::info!(
            aggregate_id = %aggregate_id,
            aggregate_type = %self.aggregate_type,
            new_version,
            event_count = events.len(),
            "appended events"
        );

        Ok(new_version)
    }

    /// Load the full event history of an aggregate, in stream order.
    pub async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<EventEnvelope<E>>> {
        let rows = sqlx::query(
            "SELECT aggregate_id, sequence_number, event_id, event_type, event_version,
                    event_data, correlation_id, user_id, timestamp
             FROM event_store
             WHERE aggregate_id = $1
             ORDER BY sequence_number ASC",
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let event_json: String = row.get("event_data");
            let event_data: E = deserialize_event(&event_json)?;

            events.push(EventEnvelope {
                event_id: row.get("event_id"),
                aggregate_id: row.get("aggregate_id"),
                sequence_number: row.get("sequence_number"),
                event_type: row.get("event_type"),
                event_version: row.get("event_version"),
                event_data,
                correlation_id: row.get("correlation_id"),
                user_id: row.get::<Option<Uuid>, _>("user_id"),
                timestamp: row.get::<DateTime<Utc>, _>("timestamp"),
            });
        }

        tracing::debug!(
            aggregate_id = %aggregate_id,
            event_count = events.len(),
            "loaded event stream"
        );
        Ok(events)
    }

    pub async fn current_version(&self, aggregate_id: Uuid) -> Result<i64> {
        let version = sqlx::query(
            "SELECT current_sequence FROM aggregate_sequence WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| row.get(0))
        .unwrap_or(0);
        Ok(version)
    }

    pub async fn load_aggregate<A>(&self, aggregate_id: Uuid) -> Result<A>
    where
        A: Aggregate<Event = E>,
        <A as Aggregate>::Error: std::fmt::Display,
    {
        let events = self.load_events(aggregate_id).await?;
        if events.is_empty() {
            bail!("aggregate not found: {}", aggregate_id);
        }
        A::load_from_events(events)
    }

    pub async fn aggregate_exists(&self, aggregate_id: Uuid) -> Result<bool> {
        Ok(self.current_version(aggregate_id).await? > 0)
    }
}
