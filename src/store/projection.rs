use anyhow::Result;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::order::aggregate::OrderAggregate;

// ============================================================================
// Order Projection
// ============================================================================
//
// Flattens the aggregate into the relational tables. Child rows are
// replaced wholesale on every write; the per-order row counts are small
// enough that diffing would buy nothing.
//
// ============================================================================

pub async fn upsert_order(
    tx: &mut Transaction<'_, Postgres>,
    order: &OrderAggregate,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO orders (
            id, order_number, client_id, provider_id, template_id, industry_id,
            status, total_price, cancelled_reason, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (id) DO UPDATE SET
            status = EXCLUDED.status,
            total_price = EXCLUDED.total_price,
            cancelled_reason = EXCLUDED.cancelled_reason,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(order.id)
    .bind(&order.order_number)
    .bind(order.client_id)
    .bind(order.provider_id)
    .bind(order.template.id)
    .bind(order.template.industry_id)
    .bind(order.status.as_str())
    .bind(order.total_price)
    .bind(&order.cancelled_reason)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await?;

    sqlx::query("DELETE FROM contracts WHERE order_id = $1")
        .bind(order.id)
        .execute(&mut **tx)
        .await?;
    for contract in &order.contracts {
        sqlx::query(
            "INSERT INTO contracts (
                id, order_id, contract_number, price, status, blocks,
                client_signed, client_signed_at, client_signature_url,
                provider_signed, provider_signed_at, provider_signature_url,
                change_request, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(contract.id)
        .bind(order.id)
        .bind(&contract.contract_number)
        .bind(contract.price)
        .bind(contract.status.as_str())
        .bind(serde_json::to_value(&contract.blocks)?)
        .bind(contract.client_signed)
        .bind(contract.client_signed_at)
        .bind(&contract.client_signature_url)
        .bind(contract.provider_signed)
        .bind(contract.provider_signed_at)
        .bind(&contract.provider_signature_url)
        .bind(
            contract
                .change_request
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        )
        .bind(contract.created_at)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query("DELETE FROM payment_installments WHERE order_id = $1")
        .bind(order.id)
        .execute(&mut **tx)
        .await?;
    for installment in &order.installments {
        sqlx::query(
            "INSERT INTO payment_installments (
                id, order_id, number, amount, status, due_at, paid_at,
                bank_name, account_number, holder_name
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(installment.id)
        .bind(order.id)
        .bind(installment.number as i32)
        .bind(installment.amount)
        .bind(installment.status.as_str())
        .bind(installment.due_at)
        .bind(installment.paid_at)
        .bind(&installment.account.bank_name)
        .bind(&installment.account.account_number)
        .bind(&installment.account.holder_name)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query("DELETE FROM delivery_items WHERE order_id = $1")
        .bind(order.id)
        .execute(&mut **tx)
        .await?;
    for item in &order.deliveries {
        sqlx::query(
            "INSERT INTO delivery_items (
                id, order_id, status, is_final, description, comment,
                created_at, delivered_at, accepted_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(item.id)
        .bind(order.id)
        .bind(item.status.as_str())
        .bind(item.is_final)
        .bind(&item.description)
        .bind(&item.comment)
        .bind(item.created_at)
        .bind(item.delivered_at)
        .bind(item.accepted_at)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query("DELETE FROM revenue_shares WHERE order_id = $1")
        .bind(order.id)
        .execute(&mut **tx)
        .await?;
    if let Some(share) = &order.revenue_share {
        sqlx::query(
            "INSERT INTO revenue_shares (
                id, order_id, rate, order_amount, share_amount, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(share.id)
        .bind(order.id)
        .bind(share.rate)
        .bind(share.order_amount)
        .bind(share.share_amount)
        .bind(share.status.as_str())
        .bind(share.created_at)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// How many other orders of this client in this industry have already
/// booked a revenue share. Feeds the repeat-business rate decay.
pub async fn prior_order_count(
    pool: &PgPool,
    client_id: Uuid,
    industry_id: Uuid,
    exclude_order_id: Uuid,
) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(*) FROM revenue_shares rs
         JOIN orders o ON o.id = rs.order_id
         WHERE o.client_id = $1 AND o.industry_id = $2 AND o.id <> $3",
    )
    .bind(client_id)
    .bind(industry_id)
    .bind(exclude_order_id)
    .fetch_one(pool)
    .await?;
    Ok(row.get(0))
}
