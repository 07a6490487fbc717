use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::enums::EventType;
use crate::events::BookingEvent;

/// Body of `POST /api/v1/bookings`.
///
/// Gender and date of birth stay as strings here so the gateway can reject
/// bad values with a descriptive 400 instead of a deserialization error;
/// they are parsed into their typed forms after validation.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "user_name is required"))]
    pub user_name: String,
    #[validate(custom(function = "crate::validation::validate_gender_field"))]
    pub user_gender: String,
    #[validate(custom(function = "crate::validation::validate_civil_date_field"))]
    pub user_dob: String,
    #[validate(length(min = 1, message = "at least one service_id is required"))]
    pub service_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingAcceptedResponse {
    pub transaction_id: Uuid,
    pub status: String,
}

/// Transaction view served by the status endpoint, derived from the
/// orchestrator's state log.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionStatusResponse {
    pub transaction_id: Uuid,
    pub current_state: EventType,
    pub events: Vec<BookingEvent>,
}
