//! Storage capabilities owned by the stateful components.
//!
//! The quota manager owns [`QuotaStore`], the orchestrator owns
//! [`StateStore`] and [`BookingStore`]. Every capability has an in-memory
//! implementation (single-binary mode and tests) and a Postgres one.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{BookingEvent, EventType, Gender, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

pub use memory::{MemoryBookingStore, MemoryQuotaStore, MemoryStateStore};
pub use postgres::{PgBookingStore, PgQuotaStore, PgStateStore};

/// Outcome of a quota acquire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaOutcome {
    Acquired,
    /// The transaction already holds an unreleased slot (redelivery).
    AlreadyHeld,
    /// No slot granted: the day is full, or the transaction's slot was
    /// already released by compensation.
    Exhausted,
}

/// The per-day discount slot arbiter.
///
/// `acquire` and `release` must be atomic with respect to one another per
/// date: `used` on any day can never observably exceed the cap.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    async fn acquire(&self, transaction_id: Uuid, date: NaiveDate, cap: i32)
        -> Result<QuotaOutcome>;

    /// Idempotent: releasing without an active allocation is a successful
    /// no-op.
    async fn release(&self, transaction_id: Uuid) -> Result<bool>;

    async fn has_active(&self, transaction_id: Uuid) -> Result<bool>;

    async fn used_on(&self, date: NaiveDate) -> Result<i32>;
}

/// The orchestrator's transaction state log.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Append an observed event and refresh the current state.
    ///
    /// Returns `false` for a redelivered event (same transaction, type, and
    /// timestamp) without touching the log.
    async fn append(&self, event: &BookingEvent) -> Result<bool>;

    async fn current_state(&self, transaction_id: Uuid) -> Result<Option<EventType>>;

    /// Full log in append order.
    async fn events(&self, transaction_id: Uuid) -> Result<Vec<BookingEvent>>;

    async fn has_event(&self, transaction_id: Uuid, event_type: EventType) -> Result<bool>;

    /// Flip the per-transaction compensation flag. Only the first caller
    /// gets `true`, so `booking.compensate` goes out at most once.
    async fn mark_compensation_emitted(&self, transaction_id: Uuid) -> Result<bool>;

    /// Transactions with no terminal event whose last update is older than
    /// `cutoff` (watchdog input).
    async fn stale_transactions(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>>;
}

/// A confirmed booking as the orchestrator finalizes it.
#[derive(Debug, Clone)]
pub struct ConfirmedBooking {
    pub transaction_id: Uuid,
    pub user_name: String,
    pub user_gender: Gender,
    pub user_dob: NaiveDate,
    pub service_ids: Vec<i32>,
    pub base_price: Decimal,
    pub discount_applied: bool,
    pub discount_percentage: Decimal,
    pub final_price: Decimal,
    pub reference_id: String,
}

/// Result of a booking insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingInsert {
    Created,
    /// A record already exists for this transaction; the original stands.
    DuplicateTransaction,
    /// The reference id lost a uniqueness race; regenerate and retry.
    DuplicateReference,
}

/// Write-once booking records keyed by transaction id.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create(&self, booking: &ConfirmedBooking) -> Result<BookingInsert>;

    async fn find(&self, transaction_id: Uuid) -> Result<Option<ConfirmedBooking>>;

    async fn reference_exists(&self, reference_id: &str) -> Result<bool>;
}
