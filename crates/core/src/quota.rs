//! Discount quota arbiter.

use clinic_types::{BookingEvent, EventType, Result};
use std::sync::Arc;

use crate::config::Settings;
use crate::store::{QuotaOutcome, QuotaStore};

/// Error reported to clients when the day's slots are gone.
pub const QUOTA_EXHAUSTED_MESSAGE: &str =
    "Daily discount quota reached. Please try again tomorrow.";

pub struct QuotaManager {
    store: Arc<dyn QuotaStore>,
    settings: Settings,
}

impl QuotaManager {
    pub fn new(store: Arc<dyn QuotaStore>, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// Consume `booking.priced` (acquire path) and `booking.compensate`
    /// (release path).
    pub async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        match event.event_type {
            EventType::Priced => self.handle_priced(event).await,
            EventType::Compensate => self.handle_compensate(event).await,
            _ => Ok(vec![]),
        }
    }

    async fn handle_priced(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        let transaction_id = event.transaction_id;
        let Some(data) = &event.data else {
            return Ok(vec![BookingEvent::quota_failed(
                transaction_id,
                "Booking data missing",
            )]);
        };

        // Ineligible bookings never touch the counter.
        if !data.discount_eligible.unwrap_or(false) {
            return Ok(vec![BookingEvent::quota_skipped(
                transaction_id,
                data.clone(),
            )]);
        }

        let date = self.settings.today();
        let cap = self.settings.max_daily_discounts;

        match self.store.acquire(transaction_id, date, cap).await? {
            QuotaOutcome::Acquired => {
                tracing::info!(%transaction_id, %date, "Discount slot acquired");
                Ok(vec![BookingEvent::quota_acquired(
                    transaction_id,
                    data.clone(),
                )])
            }
            QuotaOutcome::AlreadyHeld => {
                // Redelivered booking.priced; the earlier claim stands.
                tracing::debug!(%transaction_id, "Discount slot already held");
                Ok(vec![BookingEvent::quota_acquired(
                    transaction_id,
                    data.clone(),
                )])
            }
            QuotaOutcome::Exhausted => {
                tracing::info!(%transaction_id, %date, "Discount quota exhausted");
                Ok(vec![BookingEvent::quota_failed(
                    transaction_id,
                    QUOTA_EXHAUSTED_MESSAGE,
                )])
            }
        }
    }

    async fn handle_compensate(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        let transaction_id = event.transaction_id;

        self.store.release(transaction_id).await?;
        tracing::info!(
            %transaction_id,
            reason = event.reason.as_deref().unwrap_or("unspecified"),
            "Discount slot released"
        );

        Ok(vec![BookingEvent::quota_released(transaction_id)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryQuotaStore;
    use chrono::NaiveDate;
    use clinic_types::{BookingData, Gender};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn manager(cap: i32) -> (QuotaManager, Arc<MemoryQuotaStore>) {
        let store = Arc::new(MemoryQuotaStore::new());
        let mut settings = Settings::default();
        settings.max_daily_discounts = cap;
        (
            QuotaManager::new(store.clone() as Arc<dyn QuotaStore>, settings),
            store,
        )
    }

    fn priced(eligible: bool) -> BookingEvent {
        let mut data = BookingData::new(
            "Asha",
            Gender::Female,
            NaiveDate::from_ymd_opt(1994, 3, 21).unwrap(),
            vec![1, 4, 5, 6],
        );
        data.base_price = Some(dec!(1900.00));
        data.final_price = Some(if eligible { dec!(1672.00) } else { dec!(1900.00) });
        data.discount_eligible = Some(eligible);
        BookingEvent::priced(Uuid::new_v4(), data)
    }

    #[tokio::test]
    async fn test_ineligible_booking_skips_the_counter() {
        let (manager, store) = manager(10);

        let out = manager.handle(&priced(false)).await.unwrap();
        assert_eq!(out[0].event_type, EventType::QuotaSkipped);

        let today = Settings::default().today();
        assert_eq!(store.used_on(today).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_eligible_booking_acquires_a_slot() {
        let (manager, store) = manager(10);

        let out = manager.handle(&priced(true)).await.unwrap();
        assert_eq!(out[0].event_type, EventType::QuotaAcquired);
        // Payload is echoed through for the orchestrator's finalization.
        assert!(out[0].data.is_some());

        let today = Settings::default().today();
        assert_eq!(store.used_on(today).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_quota_fails_with_the_standard_message() {
        let (manager, _) = manager(1);

        manager.handle(&priced(true)).await.unwrap();
        let out = manager.handle(&priced(true)).await.unwrap();

        assert_eq!(out[0].event_type, EventType::QuotaFailed);
        assert_eq!(out[0].error.as_deref(), Some(QUOTA_EXHAUSTED_MESSAGE));
    }

    #[tokio::test]
    async fn test_redelivered_priced_event_is_idempotent() {
        let (manager, store) = manager(10);

        let event = priced(true);
        manager.handle(&event).await.unwrap();
        let out = manager.handle(&event).await.unwrap();

        assert_eq!(out[0].event_type, EventType::QuotaAcquired);
        let today = Settings::default().today();
        assert_eq!(store.used_on(today).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_compensate_releases_and_emits_released() {
        let (manager, store) = manager(10);

        let event = priced(true);
        manager.handle(&event).await.unwrap();

        let compensate = BookingEvent::compensate(event.transaction_id, "downstream failure");
        let out = manager.handle(&compensate).await.unwrap();

        assert_eq!(out[0].event_type, EventType::QuotaReleased);
        let today = Settings::default().today();
        assert_eq!(store.used_on(today).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_compensate_without_allocation_is_safe() {
        let (manager, _) = manager(10);

        let compensate = BookingEvent::compensate(Uuid::new_v4(), "nothing to undo");
        let out = manager.handle(&compensate).await.unwrap();

        assert_eq!(out[0].event_type, EventType::QuotaReleased);
    }
}
