use axum::{
    extract::{Path, State},
    Json,
};
use clinic_types::api::{BookingAcceptedResponse, CreateBookingRequest, TransactionStatusResponse};
use clinic_types::{parse_civil_date, BookingData, BookingEvent, Gender};
use uuid::Uuid;
use validator::Validate;

use crate::response::{self, ApiError};
use crate::state::AppState;

/// Accept a booking request: validate its shape, mint the transaction id,
/// publish `booking.initiated`, and return before any downstream work.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<Json<BookingAcceptedResponse>, ApiError> {
    // Validate input shape only; business validation happens downstream.
    payload
        .validate()
        .map_err(|e| response::bad_request(format!("Validation error: {}", e)))?;

    let user_gender: Gender = payload
        .user_gender
        .parse()
        .map_err(|_| response::bad_request("Invalid gender. Must be one of: male, female"))?;
    let user_dob = parse_civil_date(&payload.user_dob).map_err(response::bad_request)?;

    let transaction_id = Uuid::new_v4();
    let data = BookingData::new(
        payload.user_name,
        user_gender,
        user_dob,
        payload.service_ids,
    );

    // A failed publish is fatal for the request: without the initiating
    // event there is no transaction to poll.
    state
        .bus
        .publish(&BookingEvent::initiated(transaction_id, data))
        .await
        .map_err(response::bus_error)?;

    tracing::info!(%transaction_id, "Booking initiated");

    Ok(Json(BookingAcceptedResponse {
        transaction_id,
        status: "initiated".to_string(),
    }))
}

/// Read a transaction's current state and full event history from the
/// orchestrator's state log.
pub async fn get_status(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionStatusResponse>, ApiError> {
    let current_state = state
        .state_store
        .current_state(transaction_id)
        .await
        .map_err(|e| response::internal_error_msg("Failed to read transaction state", e))?
        .ok_or_else(|| response::not_found("Transaction"))?;

    let events = state
        .state_store
        .events(transaction_id)
        .await
        .map_err(|e| response::internal_error_msg("Failed to read transaction events", e))?;

    Ok(Json(TransactionStatusResponse {
        transaction_id,
        current_state,
        events,
    }))
}
