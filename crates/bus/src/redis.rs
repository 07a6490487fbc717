//! Redis pub/sub bus for the multi-process deployment.
//!
//! Events travel as JSON on a single channel. Publishing goes through a
//! multiplexed connection manager (reconnects transparently); each
//! subscription holds its own pub/sub connection.

use async_trait::async_trait;
use clinic_types::BookingEvent;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{BusError, EventBus, EventStream};

/// Default channel name for the booking topic.
pub const BOOKING_CHANNEL: &str = "booking-events";

pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
    channel: String,
}

impl RedisBus {
    /// Connect to Redis and prepare the publishing connection.
    pub async fn connect(redis_url: &str, channel: impl Into<String>) -> Result<Self, BusError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| BusError::Connection(e.to_string()))?;
        let publisher = client
            .get_connection_manager()
            .await
            .map_err(|e| BusError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            publisher,
            channel: channel.into(),
        })
    }
}

#[async_trait]
impl EventBus for RedisBus {
    async fn publish(&self, event: &BookingEvent) -> Result<(), BusError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| BusError::Publish(e.to_string()))?;

        let mut conn = self.publisher.clone();
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;

        tracing::trace!(
            event_type = %event.event_type,
            transaction_id = %event.transaction_id,
            receivers,
            "Event published to Redis"
        );

        Ok(())
    }

    async fn subscribe(&self) -> Result<EventStream, BusError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;

        pubsub
            .subscribe(&self.channel)
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))?;

        tracing::info!(channel = %self.channel, "Subscribed to Redis channel");

        let stream = pubsub.into_on_message().map(|msg| {
            let payload: String = msg
                .get_payload()
                .map_err(|e| BusError::Decode(e.to_string()))?;
            serde_json::from_str(&payload).map_err(|e| BusError::Decode(e.to_string()))
        });

        Ok(Box::pin(stream))
    }
}
