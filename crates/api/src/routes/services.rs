use axum::{
    extract::{Query, State},
    Json,
};
use clinic_types::api::{ServiceResponse, ServicesResponse};
use clinic_types::Gender;
use serde::Deserialize;

use crate::response::{self, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ServicesQuery {
    pub gender: Option<String>,
}

/// Catalog projection, optionally narrowed to what one gender can book.
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ServicesQuery>,
) -> Result<Json<ServicesResponse>, ApiError> {
    let services = match query.gender.as_deref() {
        Some(value) => {
            let gender: Gender = value
                .parse()
                .map_err(|_| response::bad_request("Invalid gender. Must be one of: male, female"))?;
            state.catalog.for_gender(gender).await
        }
        None => state.catalog.all().await,
    }
    .map_err(|e| response::internal_error_msg("Failed to fetch services", e))?;

    let services: Vec<ServiceResponse> = services.into_iter().map(Into::into).collect();

    Ok(Json(ServicesResponse { services }))
}
