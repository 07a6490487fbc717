use chrono::Utc;
use clinic_bus::EventBus;
use clinic_core::store::StateStore;
use clinic_types::{BookingEvent, EventType};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT_REASON: &str = "Booking timed out before reaching a terminal state";

/// Fail transactions stuck without a terminal event for longer than
/// `timeout`. Runs every 1 minute.
///
/// A stuck transaction that holds a discount slot gets a compensation
/// first (the orchestrator's at-most-once flag applies here too); one
/// without side effects fails directly.
pub async fn fail_stale_transactions(
    state: &Arc<dyn StateStore>,
    bus: &Arc<dyn EventBus>,
    timeout: Duration,
) -> anyhow::Result<()> {
    let cutoff = Utc::now() - chrono::Duration::from_std(timeout)?;

    let stale = state.stale_transactions(cutoff).await?;

    if stale.is_empty() {
        return Ok(());
    }

    tracing::info!("Found {} stalled transactions to fail", stale.len());

    for transaction_id in stale {
        let holds_allocation = state
            .has_event(transaction_id, EventType::QuotaAcquired)
            .await?
            && !state
                .has_event(transaction_id, EventType::QuotaReleased)
                .await?;

        if holds_allocation {
            if state.mark_compensation_emitted(transaction_id).await? {
                tracing::info!(
                    %transaction_id,
                    "Releasing discount slot of a stalled transaction"
                );
                bus.publish(&BookingEvent::compensate(transaction_id, TIMEOUT_REASON))
                    .await?;
            }
        } else {
            tracing::info!(%transaction_id, "Failing stalled transaction");

            let failed = BookingEvent::failed(transaction_id, TIMEOUT_REASON);
            state.append(&failed).await?;
            bus.publish(&failed).await?;
        }
    }

    Ok(())
}
