use chrono::{DateTime, Utc};
use sqlx::Row;

use ganvie_core::domain::target::SurveyTarget;

use super::{RepositoryError, TargetRepository};
use crate::DbPool;

pub struct SqlTargetRepository {
    pool: DbPool,
}

impl SqlTargetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TargetRepository for SqlTargetRepository {
    async fn get(&self) -> Result<SurveyTarget, RepositoryError> {
        let row = sqlx::query("SELECT households, updated_at FROM survey_target WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;

        let updated_at_raw = row.try_get::<String, _>("updated_at")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_raw)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|error| {
                RepositoryError::Decode(format!(
                    "invalid survey_target.updated_at `{updated_at_raw}` ({error})"
                ))
            })?;

        Ok(SurveyTarget::new(row.try_get("households")?, updated_at))
    }

    async fn set(&self, households: i64) -> Result<SurveyTarget, RepositoryError> {
        let updated_at = Utc::now();

        sqlx::query(
            "INSERT INTO survey_target (id, households, updated_at)
             VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                households = excluded.households,
                updated_at = excluded.updated_at",
        )
        .bind(households)
        .bind(updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(SurveyTarget::new(households, updated_at))
    }
}
