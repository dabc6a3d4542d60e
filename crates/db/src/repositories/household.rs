use sqlx::{sqlite::SqliteRow, Row};

use ganvie_core::domain::household::{
    Flag, GeoPoint, Household, HouseholdId, NeedFlags, NewHousehold, Vulnerability,
};

use super::{parse_lenient_timestamp, HouseholdRepository, RepositoryError};
use crate::DbPool;

pub struct SqlHouseholdRepository {
    pool: DbPool,
}

impl SqlHouseholdRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HouseholdRepository for SqlHouseholdRepository {
    async fn list(&self) -> Result<Vec<Household>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                collected_at,
                zone,
                lat,
                lon,
                household_size,
                main_activity,
                vulnerability,
                water_improved,
                sanitation,
                children_schooling,
                health_access,
                need_water,
                need_sanitation,
                need_housing,
                need_education,
                need_health,
                need_economic,
                notes
             FROM households
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(household_from_row).collect()
    }

    async fn insert(&self, household: NewHousehold) -> Result<HouseholdId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO households (
                collected_at,
                zone,
                lat,
                lon,
                household_size,
                main_activity,
                vulnerability,
                water_improved,
                sanitation,
                children_schooling,
                health_access,
                need_water,
                need_sanitation,
                need_housing,
                need_education,
                need_health,
                need_economic,
                notes
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(household.collected_at.to_rfc3339())
        .bind(&household.zone)
        .bind(household.location.map(|point| point.lat))
        .bind(household.location.map(|point| point.lon))
        .bind(household.household_size.map(i64::from))
        .bind(household.main_activity.as_deref())
        .bind(household.vulnerability.as_str())
        .bind(flag_to_sql(household.water_improved))
        .bind(flag_to_sql(household.sanitation))
        .bind(flag_to_sql(household.children_schooling))
        .bind(flag_to_sql(household.health_access))
        .bind(flag_to_sql(household.needs.water))
        .bind(flag_to_sql(household.needs.sanitation))
        .bind(flag_to_sql(household.needs.housing))
        .bind(flag_to_sql(household.needs.education))
        .bind(flag_to_sql(household.needs.health))
        .bind(flag_to_sql(household.needs.economic))
        .bind(household.notes.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(HouseholdId(result.last_insert_rowid()))
    }
}

fn household_from_row(row: SqliteRow) -> Result<Household, RepositoryError> {
    let id: i64 = row.try_get("id")?;

    let vulnerability_raw = row.try_get::<String, _>("vulnerability")?;
    let vulnerability: Vulnerability = vulnerability_raw
        .parse()
        .map_err(|_| RepositoryError::Decode(format!("unknown vulnerability `{vulnerability_raw}`")))?;

    let collected_at_raw = row.try_get::<String, _>("collected_at")?;
    let collected_at = parse_lenient_timestamp("households", id, &collected_at_raw);

    Ok(Household {
        id: HouseholdId(id),
        collected_at,
        zone: row.try_get("zone")?,
        location: geo_point_from_row(&row)?,
        household_size: row
            .try_get::<Option<i64>, _>("household_size")?
            .and_then(|value| u32::try_from(value).ok()),
        main_activity: row.try_get("main_activity")?,
        vulnerability,
        water_improved: flag_from_row(&row, "water_improved")?,
        sanitation: flag_from_row(&row, "sanitation")?,
        children_schooling: flag_from_row(&row, "children_schooling")?,
        health_access: flag_from_row(&row, "health_access")?,
        needs: NeedFlags {
            water: flag_from_row(&row, "need_water")?,
            sanitation: flag_from_row(&row, "need_sanitation")?,
            housing: flag_from_row(&row, "need_housing")?,
            education: flag_from_row(&row, "need_education")?,
            health: flag_from_row(&row, "need_health")?,
            economic: flag_from_row(&row, "need_economic")?,
        },
        notes: row.try_get("notes")?,
    })
}

pub(crate) fn geo_point_from_row(row: &SqliteRow) -> Result<Option<GeoPoint>, RepositoryError> {
    let lat: Option<f64> = row.try_get("lat")?;
    let lon: Option<f64> = row.try_get("lon")?;
    Ok(match (lat, lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
        _ => None,
    })
}

fn flag_from_row(row: &SqliteRow, column: &str) -> Result<Flag, RepositoryError> {
    Ok(Flag(row.try_get::<Option<i64>, _>(column)?.map(|value| value != 0)))
}

pub(crate) fn flag_to_sql(flag: Flag) -> Option<i64> {
    flag.0.map(i64::from)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use ganvie_core::domain::household::{Flag, GeoPoint, NeedFlags, NewHousehold, Vulnerability};

    use super::SqlHouseholdRepository;
    use crate::migrations;
    use crate::repositories::HouseholdRepository;
    use crate::{connect_with_settings, DbPool};

    #[tokio::test]
    async fn insert_then_list_round_trips_a_household() {
        let pool = setup_pool().await;
        let repo = SqlHouseholdRepository::new(pool.clone());

        let id = repo.insert(sample_household("Vekky")).await.expect("insert household");
        assert!(id.0 > 0);

        let rows = repo.list().await.expect("list households");
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.id, id);
        assert_eq!(row.zone, "Vekky");
        assert_eq!(row.vulnerability, Vulnerability::High);
        assert_eq!(row.location, Some(GeoPoint { lat: 6.4667, lon: 2.4167 }));
        assert_eq!(row.household_size, Some(5));
        assert!(row.water_improved.is_set());
        assert!(!row.sanitation.is_set());
        assert_eq!(row.needs.count(), 2);
        assert_eq!(
            row.collected_at,
            Some(Utc.with_ymd_and_hms(2025, 6, 5, 10, 0, 0).unwrap()),
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn null_flags_survive_the_round_trip_as_null() {
        let pool = setup_pool().await;
        let repo = SqlHouseholdRepository::new(pool.clone());

        let mut household = sample_household("Ganvie-Centre");
        household.children_schooling = Flag(None);
        household.health_access = Flag(None);
        repo.insert(household).await.expect("insert household");

        let rows = repo.list().await.expect("list households");
        assert_eq!(rows[0].children_schooling, Flag(None));
        assert_eq!(rows[0].health_access, Flag(None));

        pool.close().await;
    }

    #[tokio::test]
    async fn malformed_collected_at_is_surfaced_as_none_not_an_error() {
        let pool = setup_pool().await;
        let repo = SqlHouseholdRepository::new(pool.clone());
        repo.insert(sample_household("Vekky")).await.expect("insert household");

        sqlx::query("UPDATE households SET collected_at = 'not-a-date'")
            .execute(&pool)
            .await
            .expect("corrupt timestamp");

        let rows = repo.list().await.expect("list must tolerate malformed dates");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].collected_at.is_none());

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn sample_household(zone: &str) -> NewHousehold {
        NewHousehold {
            collected_at: Utc.with_ymd_and_hms(2025, 6, 5, 10, 0, 0).unwrap(),
            zone: zone.to_string(),
            location: Some(GeoPoint { lat: 6.4667, lon: 2.4167 }),
            household_size: Some(5),
            main_activity: Some("fishing".to_string()),
            vulnerability: Vulnerability::High,
            water_improved: true.into(),
            sanitation: false.into(),
            children_schooling: true.into(),
            health_access: false.into(),
            needs: NeedFlags {
                water: true.into(),
                sanitation: true.into(),
                ..NeedFlags::default()
            },
            notes: None,
        }
    }
}
