//! Conversion implementations from DB models to API/domain types.

use crate::models::{Service, TransactionEvent};
use clinic_types::{
    api::ServiceResponse,
    enums::ServiceAudience,
    events::BookingEvent,
};

// ============================================================================
// Service -> ServiceResponse
// ============================================================================

impl From<Service> for ServiceResponse {
    fn from(service: Service) -> Self {
        Self {
            id: service.id,
            name: service.name,
            gender: service.gender.parse().unwrap_or(ServiceAudience::Both),
            base_price: service.base_price,
        }
    }
}

impl From<&Service> for ServiceResponse {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id,
            name: service.name.clone(),
            gender: service.gender.parse().unwrap_or(ServiceAudience::Both),
            base_price: service.base_price,
        }
    }
}

// ============================================================================
// TransactionEvent -> BookingEvent
// ============================================================================

impl TryFrom<TransactionEvent> for BookingEvent {
    type Error = serde_json::Error;

    fn try_from(row: TransactionEvent) -> Result<Self, Self::Error> {
        serde_json::from_value(row.event_data)
    }
}

impl TryFrom<&TransactionEvent> for BookingEvent {
    type Error = serde_json::Error;

    fn try_from(row: &TransactionEvent) -> Result<Self, Self::Error> {
        serde_json::from_value(row.event_data.clone())
    }
}
