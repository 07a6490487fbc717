//! Saga coordinator.
//!
//! The only component that sees the transaction as a whole. Every observed
//! event lands in the state log first; decisions are then driven entirely
//! by log content, never by arrival order.

use chrono::NaiveDate;
use clinic_types::{BookingEvent, EventType, Result};
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::config::Settings;
use crate::store::{BookingInsert, BookingStore, ConfirmedBooking, StateStore};

/// Attempts at minting a unique reference id before giving up.
const REFERENCE_ID_ATTEMPTS: u32 = 5;

pub struct Orchestrator {
    state: Arc<dyn StateStore>,
    bookings: Arc<dyn BookingStore>,
    settings: Settings,
}

impl Orchestrator {
    pub fn new(
        state: Arc<dyn StateStore>,
        bookings: Arc<dyn BookingStore>,
        settings: Settings,
    ) -> Self {
        Self {
            state,
            bookings,
            settings,
        }
    }

    /// Consume every booking event: log it, then finalize or decide
    /// compensation as the log dictates.
    pub async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        let appended = self.state.append(event).await?;
        if !appended {
            // Redelivery of an event we already acted on.
            tracing::debug!(
                transaction_id = %event.transaction_id,
                event_type = %event.event_type,
                "Duplicate event dropped"
            );
            return Ok(vec![]);
        }

        // Idempotent tail: a transaction that already reached a terminal
        // state logs further events but triggers nothing.
        if self.reached_terminal_before(event).await? {
            return Ok(vec![]);
        }

        match event.event_type {
            EventType::QuotaAcquired | EventType::QuotaSkipped => self.finalize(event).await,
            t if t.is_failure() => self.handle_failure(event).await,
            _ => Ok(vec![]),
        }
    }

    async fn reached_terminal_before(&self, event: &BookingEvent) -> Result<bool> {
        for terminal in [
            EventType::Completed,
            EventType::Failed,
            EventType::QuotaReleased,
        ] {
            if terminal != event.event_type
                && self.state.has_event(event.transaction_id, terminal).await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Happy-path finalization: mint the reference id, write the booking
    /// record once, and close the log with a synthetic `booking.completed`.
    async fn finalize(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        let transaction_id = event.transaction_id;

        let Some(data) = &event.data else {
            tracing::warn!(%transaction_id, "Quota outcome without booking data; cannot finalize");
            return Ok(vec![]);
        };

        if let Some(existing) = self.bookings.find(transaction_id).await? {
            // Already finalized on another delivery path.
            tracing::debug!(%transaction_id, reference_id = %existing.reference_id, "Booking already recorded");
            return Ok(vec![]);
        }

        let today = self.settings.today();
        let mut reference_id = String::new();
        let mut created = false;

        for _ in 0..REFERENCE_ID_ATTEMPTS {
            reference_id = generate_reference_id(today);
            if self.bookings.reference_exists(&reference_id).await? {
                continue;
            }

            match self
                .bookings
                .create(&ConfirmedBooking {
                    transaction_id,
                    user_name: data.user_name.clone(),
                    user_gender: data.user_gender,
                    user_dob: data.user_dob,
                    service_ids: data.service_ids.clone(),
                    base_price: data.base_price.unwrap_or(Decimal::ZERO),
                    discount_applied: data.discount_eligible.unwrap_or(false),
                    discount_percentage: data.discount_percentage.unwrap_or(Decimal::ZERO),
                    final_price: data.final_price.unwrap_or(Decimal::ZERO),
                    reference_id: reference_id.clone(),
                })
                .await?
            {
                BookingInsert::Created => {
                    created = true;
                    break;
                }
                BookingInsert::DuplicateTransaction => return Ok(vec![]),
                BookingInsert::DuplicateReference => continue,
            }
        }

        if !created {
            return Err(clinic_types::AppError::Conflict(format!(
                "Could not mint a unique reference id for transaction {} after {} attempts",
                transaction_id, REFERENCE_ID_ATTEMPTS
            )));
        }

        tracing::info!(%transaction_id, %reference_id, "Booking confirmed");

        let completed = BookingEvent::completed(transaction_id, reference_id);
        self.state.append(&completed).await?;

        Ok(vec![completed])
    }

    /// Compensation decision: a failure owes a `booking.compensate` iff the
    /// log shows an acquired slot that was never released; otherwise the
    /// transaction fails terminally right here.
    async fn handle_failure(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        let transaction_id = event.transaction_id;
        let reason = failure_reason(event);

        let holds_allocation = self
            .state
            .has_event(transaction_id, EventType::QuotaAcquired)
            .await?
            && !self
                .state
                .has_event(transaction_id, EventType::QuotaReleased)
                .await?;

        if holds_allocation {
            if self.state.mark_compensation_emitted(transaction_id).await? {
                tracing::info!(%transaction_id, %reason, "Compensating acquired discount slot");
                Ok(vec![BookingEvent::compensate(transaction_id, reason)])
            } else {
                tracing::debug!(%transaction_id, "Compensation already emitted");
                Ok(vec![])
            }
        } else {
            tracing::info!(%transaction_id, %reason, "Booking failed without side effects");
            let failed = BookingEvent::failed(transaction_id, reason);
            self.state.append(&failed).await?;
            Ok(vec![failed])
        }
    }
}

fn failure_reason(event: &BookingEvent) -> String {
    event
        .error
        .clone()
        .or_else(|| event.errors.as_ref().map(|errors| errors.join("; ")))
        .unwrap_or_else(|| "Unknown failure".to_string())
}

/// Generate a human-visible reference id (`BK<YYYYMMDD>-<6 digits>`).
fn generate_reference_id(date: NaiveDate) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("BK{}-{}", date.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBookingStore, MemoryStateStore};
    use chrono::NaiveDate;
    use clinic_types::{BookingData, Gender};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn orchestrator() -> (
        Orchestrator,
        Arc<MemoryStateStore>,
        Arc<MemoryBookingStore>,
    ) {
        let state = Arc::new(MemoryStateStore::new());
        let bookings = Arc::new(MemoryBookingStore::new());
        (
            Orchestrator::new(
                state.clone() as Arc<dyn StateStore>,
                bookings.clone() as Arc<dyn BookingStore>,
                Settings::default(),
            ),
            state,
            bookings,
        )
    }

    fn priced_data() -> BookingData {
        let mut data = BookingData::new(
            "Asha",
            Gender::Female,
            NaiveDate::from_ymd_opt(1994, 3, 21).unwrap(),
            vec![1, 4, 5, 6],
        );
        data.base_price = Some(dec!(1900.00));
        data.final_price = Some(dec!(1672.00));
        data.discount_eligible = Some(true);
        data.discount_percentage = Some(dec!(12.0));
        data.discount_reason = Some("High-value order".to_string());
        data
    }

    #[test]
    fn test_reference_id_format() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let reference = generate_reference_id(date);

        assert!(reference.starts_with("BK20250601-"));
        let suffix = reference.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_quota_acquired_finalizes_the_booking() {
        let (orchestrator, state, bookings) = orchestrator();
        let tx = Uuid::new_v4();

        let out = orchestrator
            .handle(&BookingEvent::quota_acquired(tx, priced_data()))
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].event_type, EventType::Completed);
        assert!(out[0].reference_id.is_some());

        let booking = bookings.find(tx).await.unwrap().unwrap();
        assert_eq!(booking.final_price, dec!(1672.00));
        assert!(booking.discount_applied);

        // Invariant 4: current state is the latest appended event.
        assert_eq!(
            state.current_state(tx).await.unwrap(),
            Some(EventType::Completed)
        );
    }

    #[tokio::test]
    async fn test_quota_skipped_also_finalizes() {
        let (orchestrator, _, bookings) = orchestrator();
        let tx = Uuid::new_v4();

        let mut data = priced_data();
        data.discount_eligible = Some(false);
        data.final_price = data.base_price;

        let out = orchestrator
            .handle(&BookingEvent::quota_skipped(tx, data))
            .await
            .unwrap();

        assert_eq!(out[0].event_type, EventType::Completed);
        let booking = bookings.find(tx).await.unwrap().unwrap();
        assert!(!booking.discount_applied);
        assert_eq!(booking.final_price, dec!(1900.00));
    }

    #[tokio::test]
    async fn test_replayed_quota_outcome_creates_one_booking() {
        let (orchestrator, _, bookings) = orchestrator();
        let tx = Uuid::new_v4();
        let event = BookingEvent::quota_acquired(tx, priced_data());

        let first = orchestrator.handle(&event).await.unwrap();
        assert_eq!(first.len(), 1);
        let reference = first[0].reference_id.clone().unwrap();

        // Exact redelivery: dropped by the log dedup.
        let replay = orchestrator.handle(&event).await.unwrap();
        assert!(replay.is_empty());

        // Same outcome at a fresh timestamp: logged, but the booking record
        // guard stops a second completion.
        let mut retimed = event.clone();
        retimed.timestamp = event.timestamp + chrono::Duration::seconds(1);
        let replay = orchestrator.handle(&retimed).await.unwrap();
        assert!(replay.is_empty());

        let booking = bookings.find(tx).await.unwrap().unwrap();
        assert_eq!(booking.reference_id, reference);
    }

    #[tokio::test]
    async fn test_failure_without_allocation_fails_terminally() {
        let (orchestrator, state, _) = orchestrator();
        let tx = Uuid::new_v4();

        let out = orchestrator
            .handle(&BookingEvent::validation_failed(
                tx,
                vec!["Name required".to_string()],
            ))
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].event_type, EventType::Failed);
        assert_eq!(out[0].error.as_deref(), Some("Name required"));
        assert_eq!(
            state.current_state(tx).await.unwrap(),
            Some(EventType::Failed)
        );
    }

    #[tokio::test]
    async fn test_failure_after_completion_is_absorbed() {
        let (orchestrator, _, _) = orchestrator();
        let tx = Uuid::new_v4();

        orchestrator
            .handle(&BookingEvent::quota_acquired(tx, priced_data()))
            .await
            .unwrap();

        let failure = BookingEvent::pricing_failed(tx, "engine exploded");
        let out = orchestrator.handle(&failure).await.unwrap();

        // The transaction completed before the stray failure, so the
        // terminal tail absorbs it.
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_compensation_emitted_at_most_once() {
        let (orchestrator, state, _) = orchestrator();
        let tx = Uuid::new_v4();

        // Seed the log with an acquired slot directly (no finalization),
        // as after a watchdog-injected failure mid-flight.
        state
            .append(&BookingEvent::quota_acquired(tx, priced_data()))
            .await
            .unwrap();

        let out = orchestrator
            .handle(&BookingEvent::quota_failed(tx, "late failure"))
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].event_type, EventType::Compensate);
        assert_eq!(out[0].reason.as_deref(), Some("late failure"));

        // A second failure event does not re-compensate.
        let out = orchestrator
            .handle(&BookingEvent::pricing_failed(tx, "another failure"))
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_tail_is_inert() {
        let (orchestrator, state, bookings) = orchestrator();
        let tx = Uuid::new_v4();

        orchestrator
            .handle(&BookingEvent::validation_failed(
                tx,
                vec!["Name required".to_string()],
            ))
            .await
            .unwrap();

        // A quota outcome arriving after terminal failure is logged but
        // does not finalize.
        let out = orchestrator
            .handle(&BookingEvent::quota_skipped(tx, priced_data()))
            .await
            .unwrap();
        assert!(out.is_empty());
        assert!(bookings.find(tx).await.unwrap().is_none());
        assert!(state.has_event(tx, EventType::QuotaSkipped).await.unwrap());
    }
}
