//! Wire format for the booking topic.
//!
//! Every message carries the `{event_type, transaction_id, timestamp}` header
//! plus the type-specific fields of its event. Optional fields are omitted
//! from the JSON entirely when absent, so each event type serializes to
//! exactly the shape listed in the event catalog.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::enums::{EventType, Gender};

/// Booking request payload, carried by `booking.initiated` and echoed
/// (enriched after pricing) by every downstream success event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingData {
    pub user_name: String,
    pub user_gender: Gender,
    pub user_dob: NaiveDate,
    pub service_ids: Vec<i32>,

    // Pricing enrichment, present from booking.priced onwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_eligible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_reason: Option<String>,
}

impl BookingData {
    pub fn new(
        user_name: impl Into<String>,
        user_gender: Gender,
        user_dob: NaiveDate,
        service_ids: Vec<i32>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            user_gender,
            user_dob,
            service_ids,
            base_price: None,
            final_price: None,
            discount_eligible: None,
            discount_percentage: None,
            discount_reason: None,
        }
    }
}

/// A single message on the booking topic.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingEvent {
    pub event_type: EventType,
    pub transaction_id: Uuid,
    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BookingData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

impl BookingEvent {
    fn header(event_type: EventType, transaction_id: Uuid) -> Self {
        Self {
            event_type,
            transaction_id,
            timestamp: Utc::now(),
            data: None,
            errors: None,
            error: None,
            reason: None,
            reference_id: None,
        }
    }

    pub fn initiated(transaction_id: Uuid, data: BookingData) -> Self {
        Self {
            data: Some(data),
            ..Self::header(EventType::Initiated, transaction_id)
        }
    }

    pub fn validated(transaction_id: Uuid, data: BookingData) -> Self {
        Self {
            data: Some(data),
            ..Self::header(EventType::Validated, transaction_id)
        }
    }

    pub fn validation_failed(transaction_id: Uuid, errors: Vec<String>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::header(EventType::ValidationFailed, transaction_id)
        }
    }

    pub fn priced(transaction_id: Uuid, data: BookingData) -> Self {
        Self {
            data: Some(data),
            ..Self::header(EventType::Priced, transaction_id)
        }
    }

    pub fn pricing_failed(transaction_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::header(EventType::PricingFailed, transaction_id)
        }
    }

    pub fn quota_acquired(transaction_id: Uuid, data: BookingData) -> Self {
        Self {
            data: Some(data),
            ..Self::header(EventType::QuotaAcquired, transaction_id)
        }
    }

    pub fn quota_skipped(transaction_id: Uuid, data: BookingData) -> Self {
        Self {
            data: Some(data),
            ..Self::header(EventType::QuotaSkipped, transaction_id)
        }
    }

    pub fn quota_failed(transaction_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::header(EventType::QuotaFailed, transaction_id)
        }
    }

    pub fn quota_released(transaction_id: Uuid) -> Self {
        Self::header(EventType::QuotaReleased, transaction_id)
    }

    pub fn compensate(transaction_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::header(EventType::Compensate, transaction_id)
        }
    }

    pub fn completed(transaction_id: Uuid, reference_id: impl Into<String>) -> Self {
        Self {
            reference_id: Some(reference_id.into()),
            ..Self::header(EventType::Completed, transaction_id)
        }
    }

    pub fn failed(transaction_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::header(EventType::Failed, transaction_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> BookingData {
        BookingData::new(
            "Asha",
            Gender::Female,
            NaiveDate::from_ymd_opt(1994, 3, 21).unwrap(),
            vec![1, 4],
        )
    }

    #[test]
    fn test_initiated_wire_shape() {
        let tx = Uuid::new_v4();
        let event = BookingEvent::initiated(tx, sample_data());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "booking.initiated");
        assert_eq!(json["transaction_id"], tx.to_string());
        assert_eq!(json["data"]["user_name"], "Asha");
        assert_eq!(json["data"]["user_dob"], "1994-03-21");
        // Absent optionals must not appear on the wire.
        assert!(json.get("error").is_none());
        assert!(json.get("errors").is_none());
        assert!(json.get("reference_id").is_none());
        assert!(json["data"].get("base_price").is_none());
    }

    #[test]
    fn test_failure_events_carry_their_fields() {
        let tx = Uuid::new_v4();

        let v = BookingEvent::validation_failed(tx, vec!["Name required".into()]);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["errors"][0], "Name required");

        let q = BookingEvent::quota_failed(tx, "quota reached");
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["error"], "quota reached");

        let c = BookingEvent::compensate(tx, "quota reached");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["reason"], "quota reached");
    }

    #[test]
    fn test_event_round_trip() {
        let tx = Uuid::new_v4();
        let mut data = sample_data();
        data.base_price = Some(Decimal::new(75000, 2));
        data.discount_eligible = Some(false);

        let event = BookingEvent::priced(tx, data);
        let json = serde_json::to_string(&event).unwrap();
        let back: BookingEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(back.event_type, EventType::Priced);
        assert_eq!(back.transaction_id, tx);
        let data = back.data.unwrap();
        assert_eq!(data.base_price, Some(Decimal::new(75000, 2)));
        assert_eq!(data.discount_eligible, Some(false));
    }
}
