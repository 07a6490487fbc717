use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

/// Outcome of a quota acquire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired,
    /// The transaction already holds an unreleased slot (redelivery).
    AlreadyHeld,
    Exhausted,
}

/// Claim one discount slot for `date`, capped at `max_per_day`.
///
/// The whole attempt runs in one SQL transaction. The counter bump is the
/// conditional `UPDATE ... WHERE used < cap RETURNING used`; zero rows
/// affected means the day is exhausted. Concurrent acquires serialize on
/// the counter row lock, so `used` can never exceed the cap.
pub async fn acquire(
    pool: &PgPool,
    transaction_id: Uuid,
    date: NaiveDate,
    max_per_day: i32,
) -> Result<AcquireOutcome> {
    let mut tx = pool.begin().await?;

    // A transaction acquires at most once. Holding an unreleased slot makes
    // the replay idempotent; a released slot means the saga already rolled
    // back and the claim is refused.
    let existing: Option<(bool,)> = sqlx::query_as(
        r#"
        SELECT released FROM quota_allocations
        WHERE transaction_id = $1
        ORDER BY id DESC
        LIMIT 1
        "#
    )
    .bind(transaction_id)
    .fetch_optional(&mut *tx)
    .await?;

    match existing {
        Some((false,)) => {
            tx.commit().await?;
            return Ok(AcquireOutcome::AlreadyHeld);
        }
        Some((true,)) => {
            tx.rollback().await?;
            return Ok(AcquireOutcome::Exhausted);
        }
        None => {}
    }

    // Make sure the day's counter row exists before the conditional bump.
    sqlx::query(
        r#"
        INSERT INTO quota_counters (date, used)
        VALUES ($1, 0)
        ON CONFLICT (date) DO NOTHING
        "#
    )
    .bind(date)
    .execute(&mut *tx)
    .await?;

    let bumped: Option<(i32,)> = sqlx::query_as(
        r#"
        UPDATE quota_counters
        SET used = used + 1
        WHERE date = $1 AND used < $2
        RETURNING used
        "#
    )
    .bind(date)
    .bind(max_per_day)
    .fetch_optional(&mut *tx)
    .await?;

    if bumped.is_none() {
        tx.rollback().await?;
        return Ok(AcquireOutcome::Exhausted);
    }

    sqlx::query(
        r#"
        INSERT INTO quota_allocations (transaction_id, date, released)
        VALUES ($1, $2, FALSE)
        "#
    )
    .bind(transaction_id)
    .bind(date)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(AcquireOutcome::Acquired)
}

/// Release a transaction's slot and return it to the day's counter.
/// Idempotent: releasing a transaction with no active allocation is a no-op.
pub async fn release(pool: &PgPool, transaction_id: Uuid) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let released: Option<(NaiveDate,)> = sqlx::query_as(
        r#"
        UPDATE quota_allocations
        SET released = TRUE
        WHERE transaction_id = $1 AND released = FALSE
        RETURNING date
        "#
    )
    .bind(transaction_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some((date,)) = released {
        sqlx::query(
            r#"
            UPDATE quota_counters
            SET used = GREATEST(used - 1, 0)
            WHERE date = $1
            "#
        )
        .bind(date)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(true)
}

/// Whether the transaction currently holds an unreleased slot
pub async fn has_active_allocation(pool: &PgPool, transaction_id: Uuid) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM quota_allocations
            WHERE transaction_id = $1 AND released = FALSE
        )
        "#
    )
    .bind(transaction_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Slots used on the given day
pub async fn used_on(pool: &PgPool, date: NaiveDate) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT used FROM quota_counters WHERE date = $1"
    )
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(used,)| used).unwrap_or(0))
}
