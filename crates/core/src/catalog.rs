//! Read-only catalog capability.
//!
//! The validator, pricer, and gateway all resolve services through this one
//! trait instead of each carrying its own copy of the service list.

use async_trait::async_trait;
use clinic_db::models::Service;
use clinic_db::{queries, PgPool};
use clinic_types::{AppError, Gender, Result, ServiceAudience};
use rust_decimal::Decimal;

#[async_trait]
pub trait Catalog: Send + Sync {
    /// The whole catalog, in id order.
    async fn all(&self) -> Result<Vec<Service>>;

    /// Resolve entries for the given ids. Unknown ids are dropped from the
    /// result, not reported.
    async fn by_ids(&self, ids: &[i32]) -> Result<Vec<Service>>;

    /// Services bookable by a patient of the given gender.
    async fn for_gender(&self, gender: Gender) -> Result<Vec<Service>>;
}

/// Fixed in-memory catalog with the clinic's service list. Used by the
/// single-binary deployment and by tests.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    services: Vec<Service>,
}

impl StaticCatalog {
    pub fn new(services: Vec<Service>) -> Self {
        Self { services }
    }

    /// The seeded clinic catalog (same rows as the database migration).
    pub fn clinic_defaults() -> Self {
        let entry = |id: i32, name: &str, gender: ServiceAudience, cents: i64| Service {
            id,
            name: name.to_string(),
            gender: gender.as_str().to_string(),
            base_price: Decimal::new(cents, 2),
        };

        Self::new(vec![
            entry(1, "General Consultation", ServiceAudience::Both, 300_00),
            entry(2, "Gynecology", ServiceAudience::Female, 500_00),
            entry(3, "Ultrasound", ServiceAudience::Female, 800_00),
            entry(4, "Blood Test", ServiceAudience::Both, 450_00),
            entry(5, "Cardiology", ServiceAudience::Both, 600_00),
            entry(6, "Urology", ServiceAudience::Male, 550_00),
            entry(7, "Prostate Screening", ServiceAudience::Male, 700_00),
            entry(8, "Dermatology", ServiceAudience::Both, 400_00),
        ])
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn all(&self) -> Result<Vec<Service>> {
        Ok(self.services.clone())
    }

    async fn by_ids(&self, ids: &[i32]) -> Result<Vec<Service>> {
        Ok(self
            .services
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn for_gender(&self, gender: Gender) -> Result<Vec<Service>> {
        Ok(self
            .services
            .iter()
            .filter(|s| {
                s.gender
                    .parse::<ServiceAudience>()
                    .map(|a| a.accepts(gender))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}

/// Catalog backed by the `services` table.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn all(&self) -> Result<Vec<Service>> {
        queries::services::list_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn by_ids(&self, ids: &[i32]) -> Result<Vec<Service>> {
        queries::services::find_by_ids(&self.pool, ids)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn for_gender(&self, gender: Gender) -> Result<Vec<Service>> {
        queries::services::list_for_gender(&self.pool, gender.as_str())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}
