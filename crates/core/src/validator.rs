//! Validation step: first stop for every new booking.

use clinic_types::{BookingEvent, EventType, Result};
use std::sync::Arc;

use crate::catalog::Catalog;

pub struct Validator {
    catalog: Arc<dyn Catalog>,
}

impl Validator {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Consume `booking.initiated`; emit `booking.validated` or
    /// `booking.validation.failed` with every problem found.
    ///
    /// Unknown service ids do not produce an error here: the catalog drops
    /// them and the gender check runs over what resolved. Gender itself is
    /// already constrained by the typed payload, so only the gateway can
    /// reject a bad gender string.
    pub async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        if event.event_type != EventType::Initiated {
            return Ok(vec![]);
        }

        let transaction_id = event.transaction_id;
        let Some(data) = &event.data else {
            return Ok(vec![BookingEvent::validation_failed(
                transaction_id,
                vec!["Booking data missing".to_string()],
            )]);
        };

        let mut errors = Vec::new();

        if data.user_name.trim().is_empty() {
            errors.push("Name required".to_string());
        }

        let services = self.catalog.by_ids(&data.service_ids).await?;
        for service in &services {
            let bookable = service
                .gender
                .parse::<clinic_types::ServiceAudience>()
                .map(|audience| audience.accepts(data.user_gender))
                .unwrap_or(false);

            if !bookable {
                errors.push(format!(
                    "Service '{}' not available for {}",
                    service.name, data.user_gender
                ));
            }
        }

        if errors.is_empty() {
            tracing::debug!(%transaction_id, "Booking validated");
            Ok(vec![BookingEvent::validated(transaction_id, data.clone())])
        } else {
            tracing::info!(%transaction_id, ?errors, "Booking validation failed");
            Ok(vec![BookingEvent::validation_failed(transaction_id, errors)])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use chrono::NaiveDate;
    use clinic_types::{BookingData, Gender};
    use uuid::Uuid;

    fn validator() -> Validator {
        Validator::new(Arc::new(StaticCatalog::clinic_defaults()))
    }

    fn initiated(name: &str, gender: Gender, service_ids: Vec<i32>) -> BookingEvent {
        BookingEvent::initiated(
            Uuid::new_v4(),
            BookingData::new(
                name,
                gender,
                NaiveDate::from_ymd_opt(1995, 2, 11).unwrap(),
                service_ids,
            ),
        )
    }

    #[tokio::test]
    async fn test_valid_booking_passes_through() {
        let out = validator()
            .handle(&initiated("Ravi", Gender::Male, vec![1, 4]))
            .await
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].event_type, EventType::Validated);
        assert_eq!(out[0].data.as_ref().unwrap().service_ids, vec![1, 4]);
    }

    #[tokio::test]
    async fn test_gender_mismatch_names_the_service() {
        let out = validator()
            .handle(&initiated("Ravi", Gender::Male, vec![2]))
            .await
            .unwrap();

        assert_eq!(out[0].event_type, EventType::ValidationFailed);
        let errors = out[0].errors.as_ref().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Gynecology"));
        assert!(errors[0].contains("male"));
    }

    #[tokio::test]
    async fn test_errors_accumulate() {
        let out = validator()
            .handle(&initiated("", Gender::Male, vec![2, 3]))
            .await
            .unwrap();

        let errors = out[0].errors.as_ref().unwrap();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("Name required"));
    }

    #[tokio::test]
    async fn test_unknown_service_ids_are_silently_dropped() {
        let out = validator()
            .handle(&initiated("Ravi", Gender::Male, vec![1, 999]))
            .await
            .unwrap();

        // 999 resolves to nothing and is not an error.
        assert_eq!(out[0].event_type, EventType::Validated);
    }

    #[tokio::test]
    async fn test_other_event_types_are_ignored() {
        let event = BookingEvent::quota_released(Uuid::new_v4());
        let out = validator().handle(&event).await.unwrap();
        assert!(out.is_empty());
    }
}
