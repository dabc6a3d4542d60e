//! Health endpoint served on its own port, away from the dashboard
//! listener. Readiness means the survey store answers queries and carries
//! the migrated schema, the same bar `ganvie doctor` applies.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use ganvie_db::DbPool;
use serde::Serialize;
use tracing::{error, info};

const SURVEY_TABLES: [&str; 3] = ["households", "water_samples", "survey_target"];

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
}

/// Outcome of the store check: whether the database answered at all, and
/// whether the survey tables are present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoreCheck {
    pub reachable: bool,
    pub schema_ready: bool,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: StoreCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool })
}

pub async fn spawn(bind_address: &str, port: u16, db_pool: DbPool) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store = store_check(&state.db_pool).await;
    let ready = store.reachable && store.schema_ready;

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(pool: &DbPool) -> StoreCheck {
    let query = format!(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ({})",
        SURVEY_TABLES.map(|name| format!("'{name}'")).join(", ")
    );

    match sqlx::query_scalar::<_, i64>(&query).fetch_one(pool).await {
        Ok(found) if found == SURVEY_TABLES.len() as i64 => StoreCheck {
            reachable: true,
            schema_ready: true,
            detail: "survey schema present".to_string(),
        },
        Ok(found) => StoreCheck {
            reachable: true,
            schema_ready: false,
            detail: format!(
                "found {found} of {} survey tables, run `ganvie migrate`",
                SURVEY_TABLES.len()
            ),
        },
        Err(error) => StoreCheck {
            reachable: false,
            schema_ready: false,
            detail: format!("store query failed: {error}"),
        },
    }
}
