use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-day discount slot counter.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotaCounter {
    pub date: NaiveDate,
    pub used: i32,
}

/// One transaction's claim on a discount slot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotaAllocation {
    pub id: i64,
    pub transaction_id: Uuid,
    pub date: NaiveDate,
    pub released: bool,
    pub created_at: DateTime<Utc>,
}
