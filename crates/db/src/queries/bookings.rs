use crate::models::BookingRecord;
use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Result of a booking insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record for this transaction already exists (redelivered finalization).
    DuplicateTransaction,
    /// The generated reference id lost a uniqueness race; pick another.
    DuplicateReference,
}

/// Insert the confirmed booking exactly once per transaction.
#[allow(clippy::too_many_arguments)]
pub async fn insert_booking(
    pool: &PgPool,
    transaction_id: Uuid,
    user_name: &str,
    user_gender: &str,
    user_dob: NaiveDate,
    service_ids: &[i32],
    base_price: Decimal,
    discount_applied: bool,
    discount_percentage: Decimal,
    final_price: Decimal,
    reference_id: &str,
) -> Result<InsertOutcome> {
    let result = sqlx::query(
        r#"
        INSERT INTO bookings (
            transaction_id, user_name, user_gender, user_dob,
            service_ids, base_price, discount_applied,
            discount_percentage, final_price, booking_status, reference_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'confirmed', $10)
        ON CONFLICT (transaction_id) DO NOTHING
        "#
    )
    .bind(transaction_id)
    .bind(user_name)
    .bind(user_gender)
    .bind(user_dob)
    .bind(service_ids)
    .bind(base_price)
    .bind(discount_applied)
    .bind(discount_percentage)
    .bind(final_price)
    .bind(reference_id)
    .execute(pool)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 1 => Ok(InsertOutcome::Inserted),
        Ok(_) => Ok(InsertOutcome::DuplicateTransaction),
        // The transaction-id conflict is absorbed above, so a unique
        // violation here can only be the reference id.
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Ok(InsertOutcome::DuplicateReference)
        }
        Err(e) => Err(e.into()),
    }
}

/// Find booking by transaction id
pub async fn find_by_transaction_id(
    pool: &PgPool,
    transaction_id: Uuid,
) -> Result<Option<BookingRecord>> {
    let booking = sqlx::query_as::<_, BookingRecord>(
        "SELECT * FROM bookings WHERE transaction_id = $1"
    )
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?;

    Ok(booking)
}

/// Whether a reference id is already taken (collision check before insert)
pub async fn reference_exists(pool: &PgPool, reference_id: &str) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM bookings WHERE reference_id = $1)"
    )
    .bind(reference_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
