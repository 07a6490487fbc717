use crate::models::{TransactionEvent, TransactionState};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Append an event to a transaction's state log and refresh the
/// current-state row, in one SQL transaction.
///
/// Dedup is keyed on `(transaction_id, event_type, occurred_at)`: a
/// redelivered copy of the same event hits the unique index, changes
/// nothing, and returns `false`.
pub async fn append_event(
    pool: &PgPool,
    transaction_id: Uuid,
    event_type: &str,
    event_data: &serde_json::Value,
    occurred_at: DateTime<Utc>,
) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO transaction_events (transaction_id, event_type, event_data, occurred_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (transaction_id, event_type, occurred_at) DO NOTHING
        "#
    )
    .bind(transaction_id)
    .bind(event_type)
    .bind(event_data)
    .bind(occurred_at)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        == 1;

    if inserted {
        sqlx::query(
            r#"
            INSERT INTO transaction_state (transaction_id, current_state)
            VALUES ($1, $2)
            ON CONFLICT (transaction_id)
            DO UPDATE SET current_state = $2, updated_at = NOW()
            "#
        )
        .bind(transaction_id)
        .bind(event_type)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(inserted)
}

/// Full ordered log for a transaction
pub async fn list_events(pool: &PgPool, transaction_id: Uuid) -> Result<Vec<TransactionEvent>> {
    let events = sqlx::query_as::<_, TransactionEvent>(
        r#"
        SELECT * FROM transaction_events
        WHERE transaction_id = $1
        ORDER BY id ASC
        "#
    )
    .bind(transaction_id)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

/// Current-state row for a transaction
pub async fn find_state(pool: &PgPool, transaction_id: Uuid) -> Result<Option<TransactionState>> {
    let state = sqlx::query_as::<_, TransactionState>(
        "SELECT * FROM transaction_state WHERE transaction_id = $1"
    )
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?;

    Ok(state)
}

/// Whether the log contains the given event type for this transaction
pub async fn has_event(pool: &PgPool, transaction_id: Uuid, event_type: &str) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM transaction_events
            WHERE transaction_id = $1 AND event_type = $2
        )
        "#
    )
    .bind(transaction_id)
    .bind(event_type)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Flip the compensation flag; returns `true` only for the caller that
/// flipped it, so compensation is emitted at most once per transaction.
pub async fn mark_compensation_emitted(pool: &PgPool, transaction_id: Uuid) -> Result<bool> {
    let flipped = sqlx::query(
        r#"
        UPDATE transaction_state
        SET compensation_emitted = TRUE, updated_at = NOW()
        WHERE transaction_id = $1 AND compensation_emitted = FALSE
        "#
    )
    .bind(transaction_id)
    .execute(pool)
    .await?
    .rows_affected()
        == 1;

    Ok(flipped)
}

/// Transactions that have not reached a terminal state since `cutoff`
/// (watchdog input).
pub async fn find_stale_transactions(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT transaction_id FROM transaction_state
        WHERE current_state NOT IN ('booking.completed', 'booking.failed', 'booking.quota.released')
          AND updated_at < $1
        "#
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
