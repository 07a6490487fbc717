//! Component wiring: each handler runs a subscribe-process-republish loop
//! over the bus, so the same code serves the single-binary deployment, the
//! distributed workers, and the integration tests.

use async_trait::async_trait;
use clinic_bus::EventBus;
use clinic_types::{AppError, BookingEvent, Result};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::pricer::Pricer;
use crate::quota::QuotaManager;
use crate::store::{BookingStore, QuotaStore, StateStore};
use crate::validator::Validator;

/// Wait before resubscribing after the event stream ends.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

/// Transient-failure retries per event before relying on redelivery.
const HANDLER_ATTEMPTS: u32 = 3;

/// A component that turns one observed event into zero or more emitted
/// events (plus its own state mutations).
#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>>;
}

#[async_trait]
impl EventHandler for Validator {
    fn name(&self) -> &'static str {
        "validator"
    }

    async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        Validator::handle(self, event).await
    }
}

#[async_trait]
impl EventHandler for Pricer {
    fn name(&self) -> &'static str {
        "pricer"
    }

    async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        Pricer::handle(self, event).await
    }
}

#[async_trait]
impl EventHandler for QuotaManager {
    fn name(&self) -> &'static str {
        "quota"
    }

    async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        QuotaManager::handle(self, event).await
    }
}

#[async_trait]
impl EventHandler for Orchestrator {
    fn name(&self) -> &'static str {
        "orchestrator"
    }

    async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        Orchestrator::handle(self, event).await
    }
}

/// The four booking components, ready to be attached to a bus.
pub struct Components {
    pub validator: Arc<Validator>,
    pub pricer: Arc<Pricer>,
    pub quota: Arc<QuotaManager>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Components {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        quota_store: Arc<dyn QuotaStore>,
        state_store: Arc<dyn StateStore>,
        booking_store: Arc<dyn BookingStore>,
        settings: Settings,
    ) -> Self {
        Self {
            validator: Arc::new(Validator::new(catalog.clone())),
            pricer: Arc::new(Pricer::new(catalog, settings.clone())),
            quota: Arc::new(QuotaManager::new(quota_store, settings.clone())),
            orchestrator: Arc::new(Orchestrator::new(state_store, booking_store, settings)),
        }
    }

    /// Subscribe every component to the bus and spawn its consumer loop.
    ///
    /// Subscriptions are opened before this returns, so events published
    /// afterwards are guaranteed to reach all four components.
    pub async fn spawn(
        self,
        bus: Arc<dyn EventBus>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<JoinHandle<()>>> {
        let handlers: Vec<Arc<dyn EventHandler>> = vec![
            self.validator,
            self.pricer,
            self.quota,
            self.orchestrator,
        ];

        let mut handles = Vec::with_capacity(handlers.len());
        for handler in handlers {
            handles.push(spawn_component(bus.clone(), handler, shutdown.clone()).await?);
        }

        Ok(handles)
    }
}

/// Create the shutdown signal shared by all component loops. Send `true`
/// to stop them.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Subscribe the handler and run its consumer loop in a background task.
pub async fn spawn_component(
    bus: Arc<dyn EventBus>,
    handler: Arc<dyn EventHandler>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>> {
    let stream = bus
        .subscribe()
        .await
        .map_err(|e| AppError::Bus(e.to_string()))?;

    Ok(tokio::spawn(run_component(bus, handler, stream, shutdown)))
}

async fn run_component(
    bus: Arc<dyn EventBus>,
    handler: Arc<dyn EventHandler>,
    mut stream: clinic_bus::EventStream,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!(component = handler.name(), "Component started");

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            next = stream.next() => match next {
                Some(Ok(event)) => {
                    process_event(bus.as_ref(), handler.as_ref(), &event).await;
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        component = handler.name(),
                        error = %e,
                        "Undecodable event skipped"
                    );
                }
                None => {
                    tracing::warn!(
                        component = handler.name(),
                        "Event stream ended, resubscribing"
                    );
                    tokio::time::sleep(RESUBSCRIBE_DELAY).await;
                    match bus.subscribe().await {
                        Ok(new_stream) => stream = new_stream,
                        Err(e) => {
                            tracing::error!(
                                component = handler.name(),
                                error = %e,
                                "Resubscription failed, retrying"
                            );
                        }
                    }
                }
            }
        }
    }

    tracing::info!(component = handler.name(), "Component stopped");
}

async fn process_event(bus: &dyn EventBus, handler: &dyn EventHandler, event: &BookingEvent) {
    // Business failures come back as events; an Err from a handler is
    // infrastructure trouble and gets a bounded retry before we fall back
    // on at-least-once redelivery.
    for attempt in 1..=HANDLER_ATTEMPTS {
        match handler.handle(event).await {
            Ok(emitted) => {
                for out in emitted {
                    if let Err(e) = bus.publish(&out).await {
                        tracing::error!(
                            component = handler.name(),
                            event_type = %out.event_type,
                            transaction_id = %out.transaction_id,
                            error = %e,
                            "Failed to publish event"
                        );
                    }
                }
                return;
            }
            Err(e) if attempt < HANDLER_ATTEMPTS => {
                tracing::warn!(
                    component = handler.name(),
                    event_type = %event.event_type,
                    transaction_id = %event.transaction_id,
                    error = %e,
                    attempt,
                    "Handler error, retrying"
                );
                tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
            }
            Err(e) => {
                tracing::error!(
                    component = handler.name(),
                    event_type = %event.event_type,
                    transaction_id = %event.transaction_id,
                    error = %e,
                    "Handler error, giving up on this delivery"
                );
            }
        }
    }
}
