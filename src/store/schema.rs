use anyhow::Result;
use sqlx::PgPool;

// ============================================================================
// Schema Bootstrap
// ============================================================================

const DDL: &[&str] = &[
    // Event stream, one row per event, keyed by stream position.
    "CREATE TABLE IF NOT EXISTS event_store (
        aggregate_id UUID NOT NULL,
        sequence_number BIGINT NOT NULL,
        event_id UUID NOT NULL,
        event_type TEXT NOT NULL,
        event_version INT NOT NULL,
        event_data TEXT NOT NULL,
        correlation_id UUID NOT NULL,
        user_id UUID,
        timestamp TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (aggregate_id, sequence_number)
    )",
    // Stream head, locked FOR UPDATE on append.
    "CREATE TABLE IF NOT EXISTS aggregate_sequence (
        aggregate_id UUID PRIMARY KEY,
        current_sequence BIGINT NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id UUID PRIMARY KEY,
        order_number TEXT NOT NULL UNIQUE,
        client_id UUID NOT NULL,
        provider_id UUID NOT NULL,
        template_id UUID NOT NULL,
        industry_id UUID NOT NULL,
        status TEXT NOT NULL,
        total_price NUMERIC NOT NULL,
        cancelled_reason TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS contracts (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        contract_number TEXT NOT NULL,
        price NUMERIC NOT NULL,
        status TEXT NOT NULL,
        blocks JSONB NOT NULL,
        client_signed BOOLEAN NOT NULL,
        client_signed_at TIMESTAMPTZ,
        client_signature_url TEXT,
        provider_signed BOOLEAN NOT NULL,
        provider_signed_at TIMESTAMPTZ,
        provider_signature_url TEXT,
        change_request JSONB,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS payment_installments (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        number INT NOT NULL,
        amount NUMERIC NOT NULL,
        status TEXT NOT NULL,
        due_at TIMESTAMPTZ,
        paid_at TIMESTAMPTZ,
        bank_name TEXT NOT NULL,
        account_number TEXT NOT NULL,
        holder_name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS delivery_items (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        is_final BOOLEAN NOT NULL,
        description TEXT NOT NULL,
        comment TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        delivered_at TIMESTAMPTZ,
        accepted_at TIMESTAMPTZ
    )",
    // UNIQUE(order_id) backs the one-record-per-order invariant at the
    // storage level as well.
    "CREATE TABLE IF NOT EXISTS revenue_shares (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL UNIQUE REFERENCES orders(id) ON DELETE CASCADE,
        rate NUMERIC NOT NULL,
        order_amount NUMERIC NOT NULL,
        share_amount NUMERIC NOT NULL,
        status TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    // Serves the repeat-business lookup on the payment path.
    "CREATE INDEX IF NOT EXISTS idx_orders_client_industry
        ON orders (client_id, industry_id)",
];

/// Create all tables if they do not exist yet.
pub async fn init(pool: &PgPool) -> Result<()> {
    for statement in DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::info!(statements = DDL.len(), "schema ready");
    Ok(())
}
