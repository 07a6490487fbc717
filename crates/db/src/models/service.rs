use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog entry. Read-only from the booking flow's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: i32,
    pub name: String,
    pub gender: String,
    pub base_price: Decimal,
}
