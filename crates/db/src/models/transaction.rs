use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One observed event in a transaction's state log.
///
/// `occurred_at` is the producer timestamp from the event header;
/// `(transaction_id, event_type, occurred_at)` is the dedup key for
/// at-least-once delivery.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionEvent {
    pub id: i64,
    pub transaction_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Current-state projection of a transaction, one row per transaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionState {
    pub transaction_id: Uuid,
    pub current_state: String,
    pub compensation_emitted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
