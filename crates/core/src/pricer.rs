//! Pricing rule engine.
//!
//! Deterministic: same inputs and same calendar day always produce the same
//! prices. All arithmetic stays in `Decimal`; the final price rounds
//! half-up to 2 decimals.

use chrono::Datelike;
use clinic_types::{BookingData, BookingEvent, EventType, Gender, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::Settings;

const REASON_FEMALE_BIRTHDAY: &str = "Female birthday discount";
const REASON_HIGH_VALUE: &str = "High-value order";

/// Pricing decision for one booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub base_price: Decimal,
    pub final_price: Decimal,
    pub discount_eligible: bool,
    pub discount_percentage: Decimal,
    pub discount_reason: Option<String>,
}

pub struct Pricer {
    catalog: Arc<dyn Catalog>,
    settings: Settings,
}

impl Pricer {
    pub fn new(catalog: Arc<dyn Catalog>, settings: Settings) -> Self {
        Self { catalog, settings }
    }

    /// Compute the quote for a validated booking.
    ///
    /// Rules evaluate in order, first match wins:
    /// R1 female birthday (month and day match today in the fixed
    /// timezone), then R2 total above the high-value threshold.
    pub async fn quote(&self, data: &BookingData) -> Result<Quote> {
        let services = self.catalog.by_ids(&data.service_ids).await?;
        let base_price: Decimal = services.iter().map(|s| s.base_price).sum();

        let today = self.settings.today();
        let is_birthday =
            data.user_dob.month() == today.month() && data.user_dob.day() == today.day();

        let reason = if data.user_gender == Gender::Female && is_birthday {
            Some(REASON_FEMALE_BIRTHDAY)
        } else if base_price > self.settings.high_value_threshold {
            Some(REASON_HIGH_VALUE)
        } else {
            None
        };

        let quote = match reason {
            Some(reason) => {
                let pct = self.settings.discount_percent;
                let final_price = (base_price * (Decimal::ONE - pct / Decimal::ONE_HUNDRED))
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                Quote {
                    base_price,
                    final_price,
                    discount_eligible: true,
                    discount_percentage: pct,
                    discount_reason: Some(reason.to_string()),
                }
            }
            None => Quote {
                base_price,
                final_price: base_price,
                discount_eligible: false,
                discount_percentage: Decimal::ZERO,
                discount_reason: None,
            },
        };

        Ok(quote)
    }

    /// Consume `booking.validated`; emit `booking.priced` with the enriched
    /// payload, or `booking.pricing.failed` if the engine itself errors.
    pub async fn handle(&self, event: &BookingEvent) -> Result<Vec<BookingEvent>> {
        if event.event_type != EventType::Validated {
            return Ok(vec![]);
        }

        let transaction_id = event.transaction_id;
        let Some(data) = &event.data else {
            return Ok(vec![BookingEvent::pricing_failed(
                transaction_id,
                "Booking data missing",
            )]);
        };

        match self.quote(data).await {
            Ok(quote) => {
                let mut priced = data.clone();
                priced.base_price = Some(quote.base_price);
                priced.final_price = Some(quote.final_price);
                priced.discount_eligible = Some(quote.discount_eligible);
                priced.discount_percentage = Some(quote.discount_percentage);
                priced.discount_reason = quote.discount_reason;

                tracing::debug!(
                    %transaction_id,
                    base_price = %quote.base_price,
                    final_price = %quote.final_price,
                    eligible = quote.discount_eligible,
                    "Booking priced"
                );

                Ok(vec![BookingEvent::priced(transaction_id, priced)])
            }
            Err(e) => {
                tracing::error!(%transaction_id, error = %e, "Pricing failed");
                Ok(vec![BookingEvent::pricing_failed(
                    transaction_id,
                    e.to_string(),
                )])
            }
        }
    }
}
