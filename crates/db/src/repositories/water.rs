use sqlx::{sqlite::SqliteRow, Row};

use ganvie_core::domain::water::{NewWaterSample, RiskLevel, SampleId, Season, WaterSample};

use super::household::geo_point_from_row;
use super::{parse_lenient_timestamp, RepositoryError, WaterSampleRepository};
use crate::DbPool;

pub struct SqlWaterSampleRepository {
    pool: DbPool,
}

impl SqlWaterSampleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl WaterSampleRepository for SqlWaterSampleRepository {
    async fn list(&self) -> Result<Vec<WaterSample>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                collected_at,
                zone,
                lat,
                lon,
                season,
                ph,
                turbidity,
                conductivity,
                e_coli,
                coliforms,
                risk_level,
                comments
             FROM water_samples
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(sample_from_row).collect()
    }

    async fn insert(&self, sample: NewWaterSample) -> Result<SampleId, RepositoryError> {
        // Classification happens here, once, so every stored sample carries
        // the risk level its measurements imply.
        let risk_level = sample.risk_level();

        let result = sqlx::query(
            "INSERT INTO water_samples (
                collected_at,
                zone,
                lat,
                lon,
                season,
                ph,
                turbidity,
                conductivity,
                e_coli,
                coliforms,
                risk_level,
                comments
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sample.collected_at.to_rfc3339())
        .bind(&sample.zone)
        .bind(sample.location.map(|point| point.lat))
        .bind(sample.location.map(|point| point.lon))
        .bind(sample.season.map(Season::as_str))
        .bind(sample.ph)
        .bind(sample.turbidity)
        .bind(sample.conductivity)
        .bind(sample.e_coli)
        .bind(sample.coliforms)
        .bind(risk_level.as_str())
        .bind(sample.comments.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(SampleId(result.last_insert_rowid()))
    }
}

fn sample_from_row(row: SqliteRow) -> Result<WaterSample, RepositoryError> {
    let id: i64 = row.try_get("id")?;

    let season = row
        .try_get::<Option<String>, _>("season")?
        .map(|value| {
            value
                .parse::<Season>()
                .map_err(|_| RepositoryError::Decode(format!("unknown season `{value}`")))
        })
        .transpose()?;

    let risk_level = row
        .try_get::<Option<String>, _>("risk_level")?
        .map(|value| {
            value
                .parse::<RiskLevel>()
                .map_err(|_| RepositoryError::Decode(format!("unknown risk level `{value}`")))
        })
        .transpose()?;

    let collected_at_raw = row.try_get::<String, _>("collected_at")?;
    let collected_at = parse_lenient_timestamp("water_samples", id, &collected_at_raw);

    Ok(WaterSample {
        id: SampleId(id),
        collected_at,
        zone: row.try_get("zone")?,
        location: geo_point_from_row(&row)?,
        season,
        ph: row.try_get("ph")?,
        turbidity: row.try_get("turbidity")?,
        conductivity: row.try_get("conductivity")?,
        e_coli: row.try_get("e_coli")?,
        coliforms: row.try_get("coliforms")?,
        risk_level,
        comments: row.try_get("comments")?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use ganvie_core::domain::water::{NewWaterSample, RiskLevel, Season};

    use super::SqlWaterSampleRepository;
    use crate::migrations;
    use crate::repositories::WaterSampleRepository;
    use crate::{connect_with_settings, DbPool};

    #[tokio::test]
    async fn insert_classifies_and_stores_the_risk_level() {
        let pool = setup_pool().await;
        let repo = SqlWaterSampleRepository::new(pool.clone());

        repo.insert(sample(Some(7.1), Some(3.0), Some(4))).await.expect("insert compliant");
        repo.insert(sample(Some(7.1), Some(3.0), Some(50))).await.expect("insert watch");
        repo.insert(sample(Some(5.2), Some(3.0), Some(4))).await.expect("insert at-risk");

        let rows = repo.list().await.expect("list samples");
        let risks: Vec<Option<RiskLevel>> = rows.iter().map(|s| s.risk_level).collect();
        assert_eq!(
            risks,
            vec![
                Some(RiskLevel::Compliant),
                Some(RiskLevel::Watch),
                Some(RiskLevel::AtRisk),
            ]
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn legacy_rows_without_a_risk_level_are_readable() {
        let pool = setup_pool().await;
        let repo = SqlWaterSampleRepository::new(pool.clone());

        sqlx::query(
            "INSERT INTO water_samples (collected_at, zone, season, ph)
             VALUES ('2025-03-10T08:00:00Z', 'Vekky', 'dry', 7.0)",
        )
        .execute(&pool)
        .await
        .expect("insert legacy row");

        let rows = repo.list().await.expect("list samples");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].risk_level.is_none());
        assert_eq!(rows[0].season, Some(Season::Dry));

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn sample(ph: Option<f64>, turbidity: Option<f64>, e_coli: Option<i64>) -> NewWaterSample {
        NewWaterSample {
            collected_at: Utc.with_ymd_and_hms(2025, 6, 5, 8, 0, 0).unwrap(),
            zone: "Vekky".to_string(),
            location: None,
            season: Some(Season::Dry),
            ph,
            turbidity,
            conductivity: Some(310.0),
            e_coli,
            coliforms: None,
            comments: None,
        }
    }
}
