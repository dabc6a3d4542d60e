use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use ganvie_core::domain::household::{Household, HouseholdId, NewHousehold};
use ganvie_core::domain::target::SurveyTarget;
use ganvie_core::domain::water::{NewWaterSample, SampleId, WaterSample};

pub mod household;
pub mod memory;
pub mod target;
pub mod water;

pub use household::SqlHouseholdRepository;
pub use memory::{InMemoryHouseholdRepository, InMemoryTargetRepository, InMemoryWaterSampleRepository};
pub use target::SqlTargetRepository;
pub use water::SqlWaterSampleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait HouseholdRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Household>, RepositoryError>;
    async fn insert(&self, household: NewHousehold) -> Result<HouseholdId, RepositoryError>;
}

#[async_trait]
pub trait WaterSampleRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<WaterSample>, RepositoryError>;
    async fn insert(&self, sample: NewWaterSample) -> Result<SampleId, RepositoryError>;
}

#[async_trait]
pub trait TargetRepository: Send + Sync {
    async fn get(&self) -> Result<SurveyTarget, RepositoryError>;
    async fn set(&self, households: i64) -> Result<SurveyTarget, RepositoryError>;
}

/// Parse a stored timestamp leniently. Malformed values are logged and mapped
/// to `None`; they must never abort a read of the whole collection.
pub(crate) fn parse_lenient_timestamp(
    table: &'static str,
    row_id: i64,
    value: &str,
) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
        Err(error) => {
            tracing::warn!(table, row_id, value, %error, "skipping malformed timestamp");
            None
        }
    }
}
