//! Postgres-backed store implementations, thin wrappers over the
//! `clinic-db` queries.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_db::models::TransactionEvent;
use clinic_db::{queries, PgPool};
use clinic_types::{AppError, BookingEvent, EventType, Result};
use uuid::Uuid;

use super::{BookingInsert, BookingStore, ConfirmedBooking, QuotaOutcome, QuotaStore, StateStore};

fn internal(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(e.to_string())
}

// ============================================================================
// Quota
// ============================================================================

#[derive(Clone)]
pub struct PgQuotaStore {
    pool: PgPool,
}

impl PgQuotaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for PgQuotaStore {
    async fn acquire(
        &self,
        transaction_id: Uuid,
        date: NaiveDate,
        cap: i32,
    ) -> Result<QuotaOutcome> {
        let outcome = queries::quota::acquire(&self.pool, transaction_id, date, cap)
            .await
            .map_err(internal)?;

        Ok(match outcome {
            queries::quota::AcquireOutcome::Acquired => QuotaOutcome::Acquired,
            queries::quota::AcquireOutcome::AlreadyHeld => QuotaOutcome::AlreadyHeld,
            queries::quota::AcquireOutcome::Exhausted => QuotaOutcome::Exhausted,
        })
    }

    async fn release(&self, transaction_id: Uuid) -> Result<bool> {
        queries::quota::release(&self.pool, transaction_id)
            .await
            .map_err(internal)
    }

    async fn has_active(&self, transaction_id: Uuid) -> Result<bool> {
        queries::quota::has_active_allocation(&self.pool, transaction_id)
            .await
            .map_err(internal)
    }

    async fn used_on(&self, date: NaiveDate) -> Result<i32> {
        queries::quota::used_on(&self.pool, date)
            .await
            .map_err(internal)
    }
}

// ============================================================================
// State log
// ============================================================================

#[derive(Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn append(&self, event: &BookingEvent) -> Result<bool> {
        let event_data = serde_json::to_value(event).map_err(internal)?;

        queries::transaction_events::append_event(
            &self.pool,
            event.transaction_id,
            event.event_type.as_str(),
            &event_data,
            event.timestamp,
        )
        .await
        .map_err(internal)
    }

    async fn current_state(&self, transaction_id: Uuid) -> Result<Option<EventType>> {
        let state = queries::transaction_events::find_state(&self.pool, transaction_id)
            .await
            .map_err(internal)?;

        Ok(state.and_then(|row| row.current_state.parse().ok()))
    }

    async fn events(&self, transaction_id: Uuid) -> Result<Vec<BookingEvent>> {
        let rows = queries::transaction_events::list_events(&self.pool, transaction_id)
            .await
            .map_err(internal)?;

        rows.iter()
            .map(|row: &TransactionEvent| BookingEvent::try_from(row).map_err(internal))
            .collect()
    }

    async fn has_event(&self, transaction_id: Uuid, event_type: EventType) -> Result<bool> {
        queries::transaction_events::has_event(&self.pool, transaction_id, event_type.as_str())
            .await
            .map_err(internal)
    }

    async fn mark_compensation_emitted(&self, transaction_id: Uuid) -> Result<bool> {
        queries::transaction_events::mark_compensation_emitted(&self.pool, transaction_id)
            .await
            .map_err(internal)
    }

    async fn stale_transactions(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>> {
        queries::transaction_events::find_stale_transactions(&self.pool, cutoff)
            .await
            .map_err(internal)
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create(&self, booking: &ConfirmedBooking) -> Result<BookingInsert> {
        let outcome = queries::bookings::insert_booking(
            &self.pool,
            booking.transaction_id,
            &booking.user_name,
            booking.user_gender.as_str(),
            booking.user_dob,
            &booking.service_ids,
            booking.base_price,
            booking.discount_applied,
            booking.discount_percentage,
            booking.final_price,
            &booking.reference_id,
        )
        .await
        .map_err(internal)?;

        Ok(match outcome {
            queries::bookings::InsertOutcome::Inserted => BookingInsert::Created,
            queries::bookings::InsertOutcome::DuplicateTransaction => {
                BookingInsert::DuplicateTransaction
            }
            queries::bookings::InsertOutcome::DuplicateReference => {
                BookingInsert::DuplicateReference
            }
        })
    }

    async fn find(&self, transaction_id: Uuid) -> Result<Option<ConfirmedBooking>> {
        let record = queries::bookings::find_by_transaction_id(&self.pool, transaction_id)
            .await
            .map_err(internal)?;

        Ok(record.map(|row| ConfirmedBooking {
            transaction_id: row.transaction_id,
            user_name: row.user_name,
            user_gender: row.user_gender.parse().unwrap_or(clinic_types::Gender::Female),
            user_dob: row.user_dob,
            service_ids: row.service_ids,
            base_price: row.base_price,
            discount_applied: row.discount_applied,
            discount_percentage: row.discount_percentage,
            final_price: row.final_price,
            reference_id: row.reference_id,
        }))
    }

    async fn reference_exists(&self, reference_id: &str) -> Result<bool> {
        queries::bookings::reference_exists(&self.pool, reference_id)
            .await
            .map_err(internal)
    }
}
