use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err(()),
        }
    }
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which patients a catalog service is offered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAudience {
    Male,
    Female,
    Both,
}

impl ServiceAudience {
    /// Whether a patient of the given gender can book this service.
    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            Self::Both => true,
            Self::Male => gender == Gender::Male,
            Self::Female => gender == Gender::Female,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Both => "both",
        }
    }
}

impl FromStr for ServiceAudience {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ServiceAudience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every event type that travels on the booking topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum EventType {
    #[serde(rename = "booking.initiated")]
    Initiated,
    #[serde(rename = "booking.validated")]
    Validated,
    #[serde(rename = "booking.validation.failed")]
    ValidationFailed,
    #[serde(rename = "booking.priced")]
    Priced,
    #[serde(rename = "booking.pricing.failed")]
    PricingFailed,
    #[serde(rename = "booking.quota.acquired")]
    QuotaAcquired,
    #[serde(rename = "booking.quota.skipped")]
    QuotaSkipped,
    #[serde(rename = "booking.quota.failed")]
    QuotaFailed,
    #[serde(rename = "booking.quota.released")]
    QuotaReleased,
    #[serde(rename = "booking.compensate")]
    Compensate,
    #[serde(rename = "booking.completed")]
    Completed,
    #[serde(rename = "booking.failed")]
    Failed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "booking.initiated",
            Self::Validated => "booking.validated",
            Self::ValidationFailed => "booking.validation.failed",
            Self::Priced => "booking.priced",
            Self::PricingFailed => "booking.pricing.failed",
            Self::QuotaAcquired => "booking.quota.acquired",
            Self::QuotaSkipped => "booking.quota.skipped",
            Self::QuotaFailed => "booking.quota.failed",
            Self::QuotaReleased => "booking.quota.released",
            Self::Compensate => "booking.compensate",
            Self::Completed => "booking.completed",
            Self::Failed => "booking.failed",
        }
    }

    /// Terminal states: once logged, the transaction triggers no further actions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::QuotaReleased)
    }

    /// Failure events that put the orchestrator on the compensation-decision path.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed | Self::PricingFailed | Self::QuotaFailed
        )
    }
}

impl FromStr for EventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking.initiated" => Ok(Self::Initiated),
            "booking.validated" => Ok(Self::Validated),
            "booking.validation.failed" => Ok(Self::ValidationFailed),
            "booking.priced" => Ok(Self::Priced),
            "booking.pricing.failed" => Ok(Self::PricingFailed),
            "booking.quota.acquired" => Ok(Self::QuotaAcquired),
            "booking.quota.skipped" => Ok(Self::QuotaSkipped),
            "booking.quota.failed" => Ok(Self::QuotaFailed),
            "booking.quota.released" => Ok(Self::QuotaReleased),
            "booking.compensate" => Ok(Self::Compensate),
            "booking.completed" => Ok(Self::Completed),
            "booking.failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
