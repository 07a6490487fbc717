use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Confirmed booking, written exactly once per successful transaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingRecord {
    pub transaction_id: Uuid,
    pub user_name: String,
    pub user_gender: String,
    pub user_dob: NaiveDate,
    pub service_ids: Vec<i32>,
    pub base_price: Decimal,
    pub discount_applied: bool,
    pub discount_percentage: Decimal,
    pub final_price: Decimal,
    pub booking_status: String,
    pub reference_id: String,
    pub created_at: DateTime<Utc>,
}
