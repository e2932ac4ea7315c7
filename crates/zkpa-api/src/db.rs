//! # Database Persistence Layer
//!
//! Optional Postgres snapshots via SQLx.
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the
//! API snapshots attestations, verification receipts, and idempotency
//! registrations to PostgreSQL at its own write boundaries (create,
//! verify, revoke). When absent, the API operates in in-memory-only mode.
//! The in-memory store remains authoritative either way; the snapshots
//! exist for post-hoc audit queries, not for serving reads.
//!
//! `body` columns hold the sorted-key JSON rendering of the record and
//! are rewritten per revision (the revision is part of the body).

use sqlx::postgres::{PgPool, PgPoolOptions};

use zkpa_engine::{Attestation, VerificationReceipt};

/// Initialize the connection pool and ensure the schema exists.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or schema setup
/// fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");
    ensure_schema(&pool).await?;
    Ok(Some(pool))
}

async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS attestations (
            id TEXT PRIMARY KEY,
            state TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            completed_at TIMESTAMPTZ,
            body JSONB NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS receipts (
            id TEXT PRIMARY KEY,
            attestation_id TEXT NOT NULL REFERENCES attestations(id),
            created_at TIMESTAMPTZ NOT NULL,
            body JSONB NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS idempotency (
            key TEXT PRIMARY KEY,
            attestation_id TEXT NOT NULL,
            expires_at TIMESTAMPTZ NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    tracing::info!("Database schema ensured");
    Ok(())
}

/// Snapshot an attestation. Best-effort: failures are logged, never
/// surfaced to the request.
pub async fn persist_attestation(pool: &PgPool, att: &Attestation) {
    let body = match serde_json::to_value(att) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(attestation = %att.id, error = %err, "snapshot serialization failed");
            return;
        }
    };
    let result = sqlx::query(
        "INSERT INTO attestations (id, state, created_at, completed_at, body)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (id) DO UPDATE
         SET state = EXCLUDED.state,
             completed_at = EXCLUDED.completed_at,
             body = EXCLUDED.body",
    )
    .bind(att.id.as_str())
    .bind(att.status.as_str())
    .bind(att.created_at.as_datetime())
    .bind(att.completed_at.map(|t| *t.as_datetime()))
    .bind(body)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(attestation = %att.id, error = %err, "attestation snapshot failed");
    }
}

/// Snapshot a verification receipt (insert-only; receipts are immutable).
pub async fn persist_receipt(pool: &PgPool, receipt: &VerificationReceipt) {
    let body = match serde_json::to_value(receipt) {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(receipt = %receipt.receipt_id, error = %err, "snapshot serialization failed");
            return;
        }
    };
    let result = sqlx::query(
        "INSERT INTO receipts (id, attestation_id, created_at, body)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(receipt.receipt_id.as_str())
    .bind(receipt.attestation_id.as_str())
    .bind(receipt.verified_at.as_datetime())
    .bind(body)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(receipt = %receipt.receipt_id, error = %err, "receipt snapshot failed");
    }
}

/// Record an idempotency registration.
pub async fn persist_idempotency(pool: &PgPool, key: &str, attestation_id: &str, expires_at: chrono::DateTime<chrono::Utc>) {
    let result = sqlx::query(
        "INSERT INTO idempotency (key, attestation_id, expires_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (key) DO NOTHING",
    )
    .bind(key)
    .bind(attestation_id)
    .bind(expires_at)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(key, error = %err, "idempotency snapshot failed");
    }
}
