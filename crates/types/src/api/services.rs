use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::enums::ServiceAudience;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i32,
    pub name: String,
    pub gender: ServiceAudience,
    pub base_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServicesResponse {
    pub services: Vec<ServiceResponse>,
}
