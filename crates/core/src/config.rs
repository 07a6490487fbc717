use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Tunables of the pricing rules and the quota arbiter.
///
/// Loaded once at startup and cloned into every component so that the
/// pricer and the quota manager agree on what "today" means.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Discount slots available per calendar day
    pub max_daily_discounts: i32,
    /// Percentage applied when a discount rule matches
    pub discount_percent: Decimal,
    /// R2 threshold: orders strictly above this total are discount-eligible
    pub high_value_threshold: Decimal,
    /// Fixed timezone defining the calendar day for pricing and quota
    pub quota_timezone: Tz,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_daily_discounts: 100,
            discount_percent: Decimal::new(120, 1),
            high_value_threshold: Decimal::new(1_000_00, 2),
            quota_timezone: chrono_tz::Asia::Kolkata,
        }
    }
}

impl Settings {
    /// Load settings from environment variables, keeping defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_daily_discounts: std::env::var("MAX_DAILY_DISCOUNTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_daily_discounts),
            discount_percent: std::env::var("DISCOUNT_PERCENT")
                .ok()
                .and_then(|v| Decimal::from_str(&v).ok())
                .unwrap_or(defaults.discount_percent),
            high_value_threshold: std::env::var("HIGH_VALUE_THRESHOLD")
                .ok()
                .and_then(|v| Decimal::from_str(&v).ok())
                .unwrap_or(defaults.high_value_threshold),
            quota_timezone: std::env::var("QUOTA_TIMEZONE")
                .ok()
                .and_then(|v| v.parse::<Tz>().ok())
                .unwrap_or(defaults.quota_timezone),
        }
    }

    /// The current calendar day in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.quota_timezone).date_naive()
    }
}
