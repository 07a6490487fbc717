//! In-memory store implementations.
//!
//! Each store serializes on one mutex, which is exactly the atomicity the
//! contracts ask for: quota acquire/release linearize per process, state-log
//! appends serialize per transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::{BookingEvent, EventType, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use super::{BookingInsert, BookingStore, ConfirmedBooking, QuotaOutcome, QuotaStore, StateStore};

// ============================================================================
// Quota
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Allocation {
    date: NaiveDate,
    released: bool,
}

#[derive(Debug, Default)]
struct QuotaInner {
    counters: HashMap<NaiveDate, i32>,
    allocations: HashMap<Uuid, Allocation>,
}

#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    inner: Mutex<QuotaInner>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn acquire(
        &self,
        transaction_id: Uuid,
        date: NaiveDate,
        cap: i32,
    ) -> Result<QuotaOutcome> {
        let mut inner = self.inner.lock().expect("quota store lock poisoned");

        match inner.allocations.get(&transaction_id) {
            Some(alloc) if !alloc.released => return Ok(QuotaOutcome::AlreadyHeld),
            Some(_) => return Ok(QuotaOutcome::Exhausted),
            None => {}
        }

        let used = inner.counters.entry(date).or_insert(0);
        if *used >= cap {
            return Ok(QuotaOutcome::Exhausted);
        }

        *used += 1;
        inner.allocations.insert(
            transaction_id,
            Allocation {
                date,
                released: false,
            },
        );

        Ok(QuotaOutcome::Acquired)
    }

    async fn release(&self, transaction_id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().expect("quota store lock poisoned");

        let date = match inner.allocations.get_mut(&transaction_id) {
            Some(alloc) if !alloc.released => {
                alloc.released = true;
                alloc.date
            }
            // No active allocation: releasing is a successful no-op.
            _ => return Ok(true),
        };

        if let Some(used) = inner.counters.get_mut(&date) {
            *used = (*used - 1).max(0);
        }

        Ok(true)
    }

    async fn has_active(&self, transaction_id: Uuid) -> Result<bool> {
        let inner = self.inner.lock().expect("quota store lock poisoned");
        Ok(inner
            .allocations
            .get(&transaction_id)
            .map(|a| !a.released)
            .unwrap_or(false))
    }

    async fn used_on(&self, date: NaiveDate) -> Result<i32> {
        let inner = self.inner.lock().expect("quota store lock poisoned");
        Ok(inner.counters.get(&date).copied().unwrap_or(0))
    }
}

// ============================================================================
// State log
// ============================================================================

#[derive(Debug, Default)]
struct TransactionLog {
    events: Vec<BookingEvent>,
    seen: HashSet<(EventType, DateTime<Utc>)>,
    compensation_emitted: bool,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    logs: Mutex<HashMap<Uuid, TransactionLog>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn append(&self, event: &BookingEvent) -> Result<bool> {
        let mut logs = self.logs.lock().expect("state store lock poisoned");
        let log = logs.entry(event.transaction_id).or_default();

        if !log.seen.insert((event.event_type, event.timestamp)) {
            return Ok(false);
        }

        log.events.push(event.clone());
        log.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn current_state(&self, transaction_id: Uuid) -> Result<Option<EventType>> {
        let logs = self.logs.lock().expect("state store lock poisoned");
        Ok(logs
            .get(&transaction_id)
            .and_then(|log| log.events.last())
            .map(|event| event.event_type))
    }

    async fn events(&self, transaction_id: Uuid) -> Result<Vec<BookingEvent>> {
        let logs = self.logs.lock().expect("state store lock poisoned");
        Ok(logs
            .get(&transaction_id)
            .map(|log| log.events.clone())
            .unwrap_or_default())
    }

    async fn has_event(&self, transaction_id: Uuid, event_type: EventType) -> Result<bool> {
        let logs = self.logs.lock().expect("state store lock poisoned");
        Ok(logs
            .get(&transaction_id)
            .map(|log| log.events.iter().any(|e| e.event_type == event_type))
            .unwrap_or(false))
    }

    async fn mark_compensation_emitted(&self, transaction_id: Uuid) -> Result<bool> {
        let mut logs = self.logs.lock().expect("state store lock poisoned");
        let log = logs.entry(transaction_id).or_default();

        if log.compensation_emitted {
            Ok(false)
        } else {
            log.compensation_emitted = true;
            Ok(true)
        }
    }

    async fn stale_transactions(&self, cutoff: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let logs = self.logs.lock().expect("state store lock poisoned");
        Ok(logs
            .iter()
            .filter(|(_, log)| {
                let terminal = log
                    .events
                    .last()
                    .map(|e| e.event_type.is_terminal())
                    .unwrap_or(false);
                let stale = log.updated_at.map(|t| t < cutoff).unwrap_or(false);
                !terminal && stale
            })
            .map(|(id, _)| *id)
            .collect())
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Default)]
struct BookingInner {
    by_transaction: HashMap<Uuid, ConfirmedBooking>,
    references: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryBookingStore {
    inner: Mutex<BookingInner>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn create(&self, booking: &ConfirmedBooking) -> Result<BookingInsert> {
        let mut inner = self.inner.lock().expect("booking store lock poisoned");

        if inner.by_transaction.contains_key(&booking.transaction_id) {
            return Ok(BookingInsert::DuplicateTransaction);
        }
        if inner.references.contains(&booking.reference_id) {
            return Ok(BookingInsert::DuplicateReference);
        }

        inner.references.insert(booking.reference_id.clone());
        inner
            .by_transaction
            .insert(booking.transaction_id, booking.clone());

        Ok(BookingInsert::Created)
    }

    async fn find(&self, transaction_id: Uuid) -> Result<Option<ConfirmedBooking>> {
        let inner = self.inner.lock().expect("booking store lock poisoned");
        Ok(inner.by_transaction.get(&transaction_id).cloned())
    }

    async fn reference_exists(&self, reference_id: &str) -> Result<bool> {
        let inner = self.inner.lock().expect("booking store lock poisoned");
        Ok(inner.references.contains(reference_id))
    }
}
