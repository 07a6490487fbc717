//! End-to-end saga flows over the in-memory bus: all four components
//! wired together, driven only by published events, observed only through
//! the orchestrator's state log and the stores.

use chrono::{Datelike, NaiveDate};
use clinic_bus::{EventBus, InMemoryBus};
use clinic_core::store::{
    BookingStore, MemoryBookingStore, MemoryQuotaStore, MemoryStateStore, QuotaStore, StateStore,
};
use clinic_core::{shutdown_channel, Components, Settings, StaticCatalog, QUOTA_EXHAUSTED_MESSAGE};
use clinic_types::{BookingData, BookingEvent, EventType, Gender};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

struct TestSystem {
    bus: Arc<InMemoryBus>,
    state: Arc<MemoryStateStore>,
    bookings: Arc<MemoryBookingStore>,
    quota: Arc<MemoryQuotaStore>,
    settings: Settings,
    // Dropping the sender stops the component loops.
    _shutdown: watch::Sender<bool>,
}

async fn start_system(max_daily_discounts: i32) -> TestSystem {
    let settings = Settings {
        max_daily_discounts,
        ..Settings::default()
    };

    let bus = Arc::new(InMemoryBus::with_capacity(8192));
    let state = Arc::new(MemoryStateStore::new());
    let bookings = Arc::new(MemoryBookingStore::new());
    let quota = Arc::new(MemoryQuotaStore::new());

    let components = Components::new(
        Arc::new(StaticCatalog::clinic_defaults()),
        quota.clone() as Arc<dyn QuotaStore>,
        state.clone() as Arc<dyn StateStore>,
        bookings.clone() as Arc<dyn BookingStore>,
        settings.clone(),
    );

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    components
        .spawn(bus.clone() as Arc<dyn EventBus>, shutdown_rx)
        .await
        .expect("components failed to start");

    TestSystem {
        bus,
        state,
        bookings,
        quota,
        settings,
        _shutdown: shutdown_tx,
    }
}

impl TestSystem {
    async fn submit(&self, data: BookingData) -> Uuid {
        let transaction_id = Uuid::new_v4();
        self.bus
            .publish(&BookingEvent::initiated(transaction_id, data))
            .await
            .expect("publish failed");
        transaction_id
    }

    async fn wait_for_terminal(&self, transaction_id: Uuid) -> EventType {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(current) = self.state.current_state(transaction_id).await.unwrap() {
                if current.is_terminal() {
                    return current;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "transaction {transaction_id} did not reach a terminal state"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// A birth date falling on today's month/day (year 2000 is a leap year, so
/// this works even on Feb 29).
fn birthday_today(settings: &Settings) -> NaiveDate {
    let today = settings.today();
    NaiveDate::from_ymd_opt(2000, today.month(), today.day()).unwrap()
}

/// A birth date guaranteed not to fall on today.
fn not_birthday(settings: &Settings) -> NaiveDate {
    let today = settings.today();
    let other_month = if today.month() == 1 { 6 } else { 1 };
    NaiveDate::from_ymd_opt(2000, other_month, 15).unwrap()
}

#[tokio::test]
async fn test_female_birthday_booking_completes_with_discount() {
    let system = start_system(100).await;
    let today = system.settings.today();

    let tx = system
        .submit(BookingData::new(
            "Asha",
            Gender::Female,
            birthday_today(&system.settings),
            vec![1],
        ))
        .await;

    assert_eq!(system.wait_for_terminal(tx).await, EventType::Completed);

    let booking = system.bookings.find(tx).await.unwrap().unwrap();
    assert!(booking.discount_applied);
    assert_eq!(booking.base_price, dec!(300.00));
    assert_eq!(booking.final_price, dec!(264.00));
    assert!(booking.reference_id.starts_with("BK"));

    assert_eq!(system.quota.used_on(today).await.unwrap(), 1);
}

#[tokio::test]
async fn test_ordinary_booking_completes_without_touching_quota() {
    let system = start_system(100).await;
    let today = system.settings.today();

    let tx = system
        .submit(BookingData::new(
            "Ravi",
            Gender::Male,
            not_birthday(&system.settings),
            vec![1, 4],
        ))
        .await;

    assert_eq!(system.wait_for_terminal(tx).await, EventType::Completed);

    let booking = system.bookings.find(tx).await.unwrap().unwrap();
    assert!(!booking.discount_applied);
    assert_eq!(booking.final_price, dec!(750.00));

    // The log walked the skip path, not the acquire path.
    assert!(system
        .state
        .has_event(tx, EventType::QuotaSkipped)
        .await
        .unwrap());
    assert_eq!(system.quota.used_on(today).await.unwrap(), 0);
}

#[tokio::test]
async fn test_high_value_booking_consumes_a_slot() {
    let system = start_system(100).await;
    let today = system.settings.today();

    let tx = system
        .submit(BookingData::new(
            "Ravi",
            Gender::Male,
            not_birthday(&system.settings),
            vec![1, 4, 5, 6],
        ))
        .await;

    assert_eq!(system.wait_for_terminal(tx).await, EventType::Completed);

    let booking = system.bookings.find(tx).await.unwrap().unwrap();
    assert_eq!(booking.base_price, dec!(1900.00));
    assert_eq!(booking.final_price, dec!(1672.00));
    assert_eq!(system.quota.used_on(today).await.unwrap(), 1);
}

#[tokio::test]
async fn test_gender_mismatch_fails_without_side_effects() {
    let system = start_system(100).await;
    let today = system.settings.today();

    // Gynecology is female-only.
    let tx = system
        .submit(BookingData::new(
            "Ravi",
            Gender::Male,
            not_birthday(&system.settings),
            vec![2],
        ))
        .await;

    assert_eq!(system.wait_for_terminal(tx).await, EventType::Failed);

    let events = system.state.events(tx).await.unwrap();
    let validation_failure = events
        .iter()
        .find(|e| e.event_type == EventType::ValidationFailed)
        .expect("validation failure should be logged");
    assert!(validation_failure.errors.as_ref().unwrap()[0].contains("Gynecology"));

    assert!(system.bookings.find(tx).await.unwrap().is_none());
    assert_eq!(system.quota.used_on(today).await.unwrap(), 0);
    // No slot was ever acquired, so nothing was compensated.
    assert!(!system
        .state
        .has_event(tx, EventType::Compensate)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_booking_past_the_daily_cap_fails() {
    let system = start_system(3).await;
    let today = system.settings.today();

    let high_value = |settings: &Settings| {
        BookingData::new("Ravi", Gender::Male, not_birthday(settings), vec![1, 4, 5, 6])
    };

    for _ in 0..3 {
        let tx = system.submit(high_value(&system.settings)).await;
        assert_eq!(system.wait_for_terminal(tx).await, EventType::Completed);
    }

    // The cap is spent; the next eligible booking fails terminally.
    let tx = system.submit(high_value(&system.settings)).await;
    assert_eq!(system.wait_for_terminal(tx).await, EventType::Failed);

    let events = system.state.events(tx).await.unwrap();
    let quota_failure = events
        .iter()
        .find(|e| e.event_type == EventType::QuotaFailed)
        .expect("quota failure should be logged");
    assert_eq!(quota_failure.error.as_deref(), Some(QUOTA_EXHAUSTED_MESSAGE));

    assert!(system.bookings.find(tx).await.unwrap().is_none());
    assert_eq!(system.quota.used_on(today).await.unwrap(), 3);
}

#[tokio::test]
async fn test_concurrent_high_value_bookings_split_at_the_cap() {
    let system = start_system(100).await;
    let today = system.settings.today();

    let mut transactions = Vec::new();
    for _ in 0..200 {
        let data = BookingData::new(
            "Ravi",
            Gender::Male,
            not_birthday(&system.settings),
            vec![1, 4, 5, 6],
        );
        transactions.push(system.submit(data).await);
    }

    let mut completed = 0;
    let mut failed = 0;
    for tx in transactions {
        match system.wait_for_terminal(tx).await {
            EventType::Completed => completed += 1,
            EventType::Failed => failed += 1,
            other => panic!("unexpected terminal state {other}"),
        }
    }

    assert_eq!(completed, 100);
    assert_eq!(failed, 100);
    assert_eq!(system.quota.used_on(today).await.unwrap(), 100);
}

#[tokio::test]
async fn test_replayed_initiated_event_creates_one_booking() {
    let system = start_system(100).await;

    let tx = Uuid::new_v4();
    let event = BookingEvent::initiated(
        tx,
        BookingData::new(
            "Asha",
            Gender::Female,
            not_birthday(&system.settings),
            vec![1, 4],
        ),
    );

    // At-least-once delivery: the same message arrives three times.
    for _ in 0..3 {
        system.bus.publish(&event).await.unwrap();
    }

    system.wait_for_terminal(tx).await;
    // Give any replay fallout time to flow through.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let booking = system.bookings.find(tx).await.unwrap().unwrap();
    assert_eq!(booking.final_price, dec!(750.00));

    // Exactly one completion in the log despite the replays.
    let events = system.state.events(tx).await.unwrap();
    let completions = events
        .iter()
        .filter(|e| e.event_type == EventType::Completed)
        .count();
    assert_eq!(completions, 1);
}
