//! In-memory repository implementations for tests and wiring experiments.

use std::sync::Mutex;

use chrono::Utc;

use ganvie_core::domain::household::{Household, HouseholdId, NewHousehold};
use ganvie_core::domain::target::{SurveyTarget, DEFAULT_HOUSEHOLD_TARGET};
use ganvie_core::domain::water::{NewWaterSample, SampleId, WaterSample};

use super::{HouseholdRepository, RepositoryError, TargetRepository, WaterSampleRepository};

#[derive(Default)]
pub struct InMemoryHouseholdRepository {
    rows: Mutex<Vec<Household>>,
}

impl InMemoryHouseholdRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Household>) -> Self {
        Self { rows: Mutex::new(rows) }
    }
}

#[async_trait::async_trait]
impl HouseholdRepository for InMemoryHouseholdRepository {
    async fn list(&self) -> Result<Vec<Household>, RepositoryError> {
        Ok(self.rows.lock().map_err(|_| poisoned())?.clone())
    }

    async fn insert(&self, household: NewHousehold) -> Result<HouseholdId, RepositoryError> {
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        let id = HouseholdId(rows.len() as i64 + 1);
        rows.push(Household {
            id,
            collected_at: Some(household.collected_at),
            zone: household.zone,
            location: household.location,
            household_size: household.household_size,
            main_activity: household.main_activity,
            vulnerability: household.vulnerability,
            water_improved: household.water_improved,
            sanitation: household.sanitation,
            children_schooling: household.children_schooling,
            health_access: household.health_access,
            needs: household.needs,
            notes: household.notes,
        });
        Ok(id)
    }
}

#[derive(Default)]
pub struct InMemoryWaterSampleRepository {
    rows: Mutex<Vec<WaterSample>>,
}

impl InMemoryWaterSampleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<WaterSample>) -> Self {
        Self { rows: Mutex::new(rows) }
    }
}

#[async_trait::async_trait]
impl WaterSampleRepository for InMemoryWaterSampleRepository {
    async fn list(&self) -> Result<Vec<WaterSample>, RepositoryError> {
        Ok(self.rows.lock().map_err(|_| poisoned())?.clone())
    }

    async fn insert(&self, sample: NewWaterSample) -> Result<SampleId, RepositoryError> {
        let risk_level = sample.risk_level();
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        let id = SampleId(rows.len() as i64 + 1);
        rows.push(WaterSample {
            id,
            collected_at: Some(sample.collected_at),
            zone: sample.zone,
            location: sample.location,
            season: sample.season,
            ph: sample.ph,
            turbidity: sample.turbidity,
            conductivity: sample.conductivity,
            e_coli: sample.e_coli,
            coliforms: sample.coliforms,
            risk_level: Some(risk_level),
            comments: sample.comments,
        });
        Ok(id)
    }
}

pub struct InMemoryTargetRepository {
    target: Mutex<SurveyTarget>,
}

impl InMemoryTargetRepository {
    pub fn new() -> Self {
        Self { target: Mutex::new(SurveyTarget::new(DEFAULT_HOUSEHOLD_TARGET, Utc::now())) }
    }
}

impl Default for InMemoryTargetRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TargetRepository for InMemoryTargetRepository {
    async fn get(&self) -> Result<SurveyTarget, RepositoryError> {
        Ok(*self.target.lock().map_err(|_| poisoned())?)
    }

    async fn set(&self, households: i64) -> Result<SurveyTarget, RepositoryError> {
        let mut target = self.target.lock().map_err(|_| poisoned())?;
        *target = SurveyTarget::new(households, Utc::now());
        Ok(*target)
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::Decode("in-memory repository lock poisoned".to_string())
}
