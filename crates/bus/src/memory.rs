//! In-process bus over a tokio broadcast channel.

use async_trait::async_trait;
use clinic_types::BookingEvent;
use tokio::sync::broadcast;

use crate::{BusError, EventBus, EventStream};

/// Buffer depth per subscriber; slow consumers past this lag lose events
/// and a warning is logged.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct InMemoryBus {
    sender: broadcast::Sender<BookingEvent>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of live subscriptions (used by tests and startup checks).
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, event: &BookingEvent) -> Result<(), BusError> {
        // send() only errors when there are no receivers; with pub/sub
        // semantics that just means nobody is listening yet.
        match self.sender.send(event.clone()) {
            Ok(subscribers) => {
                tracing::trace!(
                    event_type = %event.event_type,
                    transaction_id = %event.transaction_id,
                    subscribers,
                    "Event published"
                );
            }
            Err(_) => {
                tracing::debug!(
                    event_type = %event.event_type,
                    transaction_id = %event.transaction_id,
                    "Event published with no subscribers"
                );
            }
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<EventStream, BusError> {
        // The receiver starts buffering as soon as it exists, before the
        // stream is first polled, so no events are lost in between.
        let mut rx = self.sender.subscribe();

        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield Ok(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Bus subscriber lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clinic_types::{BookingData, Gender};
    use futures::StreamExt;
    use uuid::Uuid;

    fn sample_event() -> BookingEvent {
        BookingEvent::initiated(
            Uuid::new_v4(),
            BookingData::new(
                "Ravi",
                Gender::Male,
                NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                vec![1],
            ),
        )
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe().await.unwrap();

        let event = sample_event();
        bus.publish(&event).await.unwrap();

        let received = stream.next().await.unwrap().unwrap();
        assert_eq!(received.event_type, event.event_type);
        assert_eq!(received.transaction_id, event.transaction_id);
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_a_copy() {
        let bus = InMemoryBus::new();
        let mut first = bus.subscribe().await.unwrap();
        let mut second = bus.subscribe().await.unwrap();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(&sample_event()).await.unwrap();

        assert!(first.next().await.unwrap().is_ok());
        assert!(second.next().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = InMemoryBus::new();
        assert!(bus.publish(&sample_event()).await.is_ok());
    }
}
