//! Event bus capability for the booking topic.
//!
//! All components publish and consume [`BookingEvent`]s through the
//! [`EventBus`] trait, so the saga logic never knows which transport is
//! underneath. Two implementations:
//!
//! - [`InMemoryBus`] - tokio broadcast channel, used by the single-binary
//!   deployment and by tests
//! - [`RedisBus`] - Redis pub/sub, used when the components run as
//!   separate processes
//!
//! Delivery is at-least-once from the consumers' point of view; handlers
//! must stay idempotent.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use clinic_types::BookingEvent;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

pub use self::memory::InMemoryBus;
pub use self::redis::{RedisBus, BOOKING_CHANNEL};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Subscription failed: {0}")]
    Subscribe(String),

    #[error("Failed to decode event: {0}")]
    Decode(String),
}

/// Stream of events delivered to one subscriber.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<BookingEvent, BusError>> + Send>>;

/// Publish/subscribe access to the single booking topic.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish one event to every current subscriber.
    async fn publish(&self, event: &BookingEvent) -> Result<(), BusError>;

    /// Open a new subscription carrying every event published after this
    /// call returns.
    async fn subscribe(&self) -> Result<EventStream, BusError>;
}
