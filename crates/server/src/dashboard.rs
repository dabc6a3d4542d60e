//! Dashboard routes over the filtered survey collections.
//!
//! HTML endpoints:
//! - `GET  /`                          - dashboard overview page
//! - `GET  /report/download`           - synthesis report (PDF or HTML)
//!
//! JSON API endpoints:
//! - `GET  /api/kpis`                  - headline indicators
//! - `GET  /api/zones`                 - zone ranking by composite score
//! - `GET  /api/insights`              - rule-engine recommendations
//! - `GET  /api/households`            - filtered household rows
//! - `GET  /api/water-samples`         - filtered water sample rows
//! - `GET  /api/target`                - survey target
//! - `PUT  /api/target`                - replace the survey target
//! - `POST /api/cache/refresh`         - drop the read cache
//!
//! CSV exports:
//! - `GET  /export/households.csv`
//! - `GET  /export/water-samples.csv`
//!
//! All read endpoints accept the same filter query parameters: `zones`,
//! `vulnerability` and `needs` as comma-separated lists, `start` and `end`
//! as ISO dates. Omitted parameters fall back to the widest selection.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use tracing::{info, warn};

use ganvie_core::domain::household::{Flag, Household, NeedKind, Vulnerability};
use ganvie_core::domain::target::SurveyTarget;
use ganvie_core::domain::water::{Season, WaterSample};
use ganvie_core::errors::{ApplicationError, DomainError, InterfaceError};
use ganvie_core::filters::{apply_filters, FilterOutcome, FilterOverrides};
use ganvie_core::insights::generate_insights;
use ganvie_core::kpi::{compute_kpis, compute_need_totals};
use ganvie_core::zones::compute_zone_ranking;
use ganvie_db::repositories::{
    HouseholdRepository, RepositoryError, SqlHouseholdRepository, SqlTargetRepository,
    SqlWaterSampleRepository, TargetRepository, WaterSampleRepository,
};
use ganvie_db::DbPool;

use crate::cache::SnapshotCache;
use crate::pdf::{register_template_filters, ReportRenderer};

#[derive(Clone)]
pub struct DashboardState {
    households: Arc<dyn HouseholdRepository>,
    samples: Arc<dyn WaterSampleRepository>,
    target: Arc<dyn TargetRepository>,
    cache: Arc<SnapshotCache<Arc<Snapshot>>>,
    templates: Arc<Tera>,
    reports: Arc<ReportRenderer>,
}

/// The raw collections as last read from the store.
pub struct Snapshot {
    pub households: Vec<Household>,
    pub samples: Vec<WaterSample>,
    pub target: SurveyTarget,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/dashboard/**/*") {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "failed to load dashboard templates from filesystem, using embedded fallback");
            Tera::default()
        }
    };

    register_template_filters(&mut tera);
    tera.add_raw_template("index.html", include_str!("../../../templates/dashboard/index.html"))
        .ok();

    Arc::new(tera)
}

fn init_report_renderer(template_dir: Option<&Path>) -> Arc<ReportRenderer> {
    let renderer = template_dir
        .and_then(|dir| match ReportRenderer::new(&dir.to_string_lossy()) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                warn!(error = %e, "failed to load report templates, using embedded fallback");
                None
            }
        })
        .unwrap_or_else(ReportRenderer::with_embedded_templates);

    Arc::new(renderer)
}

pub fn router(db_pool: DbPool, cache_ttl: Duration, report_template_dir: Option<&Path>) -> Router {
    let state = DashboardState {
        households: Arc::new(SqlHouseholdRepository::new(db_pool.clone())),
        samples: Arc::new(SqlWaterSampleRepository::new(db_pool.clone())),
        target: Arc::new(SqlTargetRepository::new(db_pool)),
        cache: Arc::new(SnapshotCache::new(cache_ttl)),
        templates: init_templates(),
        reports: init_report_renderer(report_template_dir),
    };
    router_with_state(state)
}

/// Router over caller-supplied repositories. Tests use this with the
/// in-memory implementations.
pub fn router_with_repos(
    households: Arc<dyn HouseholdRepository>,
    samples: Arc<dyn WaterSampleRepository>,
    target: Arc<dyn TargetRepository>,
    cache_ttl: Duration,
) -> Router {
    let state = DashboardState {
        households,
        samples,
        target,
        cache: Arc::new(SnapshotCache::new(cache_ttl)),
        templates: init_templates(),
        reports: init_report_renderer(None),
    };
    router_with_state(state)
}

fn router_with_state(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/report/download", get(download_report))
        .route("/api/kpis", get(get_kpis))
        .route("/api/zones", get(get_zones))
        .route("/api/insights", get(get_insights))
        .route("/api/needs", get(get_needs))
        .route("/api/households", get(get_households))
        .route("/api/water-samples", get(get_water_samples))
        .route("/api/target", get(get_target).put(put_target))
        .route("/api/cache/refresh", post(refresh_cache))
        .route("/export/households.csv", get(export_households_csv))
        .route("/export/water-samples.csv", get(export_water_samples_csv))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Filter parameters shared by every read endpoint. List parameters are
/// comma-separated; an explicitly empty list selects nothing.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub zones: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub vulnerability: Option<String>,
    pub needs: Option<String>,
}

impl FilterQuery {
    fn into_overrides(self) -> Result<FilterOverrides, DomainError> {
        Ok(FilterOverrides {
            zones: self.zones.map(|raw| split_list(&raw).map(String::from).collect()),
            start: self.start,
            end: self.end,
            vulnerability: self
                .vulnerability
                .map(|raw| parse_list::<Vulnerability>(&raw))
                .transpose()?,
            needs: self.needs.map(|raw| parse_list::<NeedKind>(&raw)).transpose()?,
        })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn parse_list<T: FromStr<Err = DomainError>>(raw: &str) -> Result<Vec<T>, DomainError> {
    split_list(raw).map(str::parse).collect()
}

#[derive(Debug, Deserialize)]
pub struct TargetUpdate {
    pub households: i64,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: &'static str,
}

fn error_response(error: InterfaceError) -> Response {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: error.to_string(), message: error.user_message() }))
        .into_response()
}

fn repository_failure(error: RepositoryError) -> Response {
    error_response(ApplicationError::Persistence(error.to_string()).into())
}

fn domain_failure(error: DomainError) -> Response {
    error_response(ApplicationError::from(error).into())
}

// ---------------------------------------------------------------------------
// Snapshot loading and filtering
// ---------------------------------------------------------------------------

async fn load_snapshot(state: &DashboardState) -> Result<Arc<Snapshot>, RepositoryError> {
    if let Some(snapshot) = state.cache.get() {
        return Ok(snapshot);
    }

    let households = state.households.list().await?;
    let samples = state.samples.list().await?;
    let target = state.target.get().await?;

    let snapshot = Arc::new(Snapshot { households, samples, target });
    state.cache.put(snapshot.clone());
    Ok(snapshot)
}

async fn filtered(
    state: &DashboardState,
    query: FilterQuery,
) -> Result<(FilterOutcome, SurveyTarget), Response> {
    let overrides = query.into_overrides().map_err(domain_failure)?;
    let snapshot = load_snapshot(state).await.map_err(repository_failure)?;

    let outcome = apply_filters(
        snapshot.households.clone(),
        snapshot.samples.clone(),
        overrides,
        Utc::now().date_naive(),
    );
    Ok((outcome, snapshot.target))
}

// ---------------------------------------------------------------------------
// JSON handlers
// ---------------------------------------------------------------------------

async fn get_kpis(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match filtered(&state, query).await {
        Ok((outcome, target)) => {
            Json(compute_kpis(&outcome.households, target.households)).into_response()
        }
        Err(response) => response,
    }
}

async fn get_zones(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match filtered(&state, query).await {
        Ok((outcome, _)) => Json(compute_zone_ranking(&outcome.households)).into_response(),
        Err(response) => response,
    }
}

async fn get_insights(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match filtered(&state, query).await {
        Ok((outcome, target)) => {
            Json(generate_insights(&outcome.households, &outcome.samples, target.households))
                .into_response()
        }
        Err(response) => response,
    }
}

async fn get_needs(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match filtered(&state, query).await {
        Ok((outcome, _)) => Json(compute_need_totals(&outcome.households)).into_response(),
        Err(response) => response,
    }
}

async fn get_households(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match filtered(&state, query).await {
        Ok((outcome, _)) => Json(outcome.households).into_response(),
        Err(response) => response,
    }
}

async fn get_water_samples(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match filtered(&state, query).await {
        Ok((outcome, _)) => Json(outcome.samples).into_response(),
        Err(response) => response,
    }
}

async fn get_target(State(state): State<DashboardState>) -> Response {
    match state.target.get().await {
        Ok(target) => Json(target).into_response(),
        Err(error) => repository_failure(error),
    }
}

async fn put_target(
    State(state): State<DashboardState>,
    Json(update): Json<TargetUpdate>,
) -> Response {
    if update.households <= 0 {
        return domain_failure(DomainError::InvariantViolation(format!(
            "survey target must be positive, got {}",
            update.households
        )));
    }

    match state.target.set(update.households).await {
        Ok(target) => {
            state.cache.invalidate();
            info!(
                event_name = "dashboard.target.updated",
                households = target.households,
                "survey target replaced"
            );
            Json(target).into_response()
        }
        Err(error) => repository_failure(error),
    }
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    status: &'static str,
}

async fn refresh_cache(State(state): State<DashboardState>) -> Response {
    state.cache.invalidate();
    Json(RefreshResponse { status: "refreshed" }).into_response()
}

// ---------------------------------------------------------------------------
// CSV exports
// ---------------------------------------------------------------------------

fn csv_flag(flag: Flag) -> &'static str {
    match flag.0 {
        Some(true) => "1",
        Some(false) => "0",
        None => "",
    }
}

fn households_csv(rows: &[Household]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "collected_at",
        "zone",
        "lat",
        "lon",
        "household_size",
        "main_activity",
        "vulnerability",
        "water_improved",
        "sanitation",
        "children_schooling",
        "health_access",
        "need_water",
        "need_sanitation",
        "need_housing",
        "need_education",
        "need_health",
        "need_economic",
        "need_count",
        "notes",
    ])?;

    for row in rows {
        writer.write_record([
            row.id.0.to_string(),
            row.collected_at.map(|at| at.to_rfc3339()).unwrap_or_default(),
            row.zone.clone(),
            row.location.map(|p| p.lat.to_string()).unwrap_or_default(),
            row.location.map(|p| p.lon.to_string()).unwrap_or_default(),
            row.household_size.map(|size| size.to_string()).unwrap_or_default(),
            row.main_activity.clone().unwrap_or_default(),
            row.vulnerability.as_str().to_string(),
            csv_flag(row.water_improved).to_string(),
            csv_flag(row.sanitation).to_string(),
            csv_flag(row.children_schooling).to_string(),
            csv_flag(row.health_access).to_string(),
            csv_flag(row.needs.water).to_string(),
            csv_flag(row.needs.sanitation).to_string(),
            csv_flag(row.needs.housing).to_string(),
            csv_flag(row.needs.education).to_string(),
            csv_flag(row.needs.health).to_string(),
            csv_flag(row.needs.economic).to_string(),
            row.need_count().to_string(),
            row.notes.clone().unwrap_or_default(),
        ])?;
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

fn water_samples_csv(rows: &[WaterSample]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "id",
        "collected_at",
        "zone",
        "lat",
        "lon",
        "season",
        "ph",
        "turbidity",
        "conductivity",
        "e_coli",
        "coliforms",
        "risk_level",
        "comments",
    ])?;

    for row in rows {
        writer.write_record([
            row.id.0.to_string(),
            row.collected_at.map(|at| at.to_rfc3339()).unwrap_or_default(),
            row.zone.clone(),
            row.location.map(|p| p.lat.to_string()).unwrap_or_default(),
            row.location.map(|p| p.lon.to_string()).unwrap_or_default(),
            row.season.map(Season::as_str).unwrap_or_default().to_string(),
            row.ph.map(|v| v.to_string()).unwrap_or_default(),
            row.turbidity.map(|v| v.to_string()).unwrap_or_default(),
            row.conductivity.map(|v| v.to_string()).unwrap_or_default(),
            row.e_coli.map(|v| v.to_string()).unwrap_or_default(),
            row.coliforms.map(|v| v.to_string()).unwrap_or_default(),
            row.risk_level.map(|v| v.as_str()).unwrap_or_default().to_string(),
            row.comments.clone().unwrap_or_default(),
        ])?;
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

fn csv_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response()
}

async fn export_households_csv(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match filtered(&state, query).await {
        Ok((outcome, _)) => match households_csv(&outcome.households) {
            Ok(bytes) => csv_response(bytes, "households.csv"),
            Err(error) => {
                error_response(InterfaceError::Internal { message: error.to_string() })
            }
        },
        Err(response) => response,
    }
}

async fn export_water_samples_csv(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match filtered(&state, query).await {
        Ok((outcome, _)) => match water_samples_csv(&outcome.samples) {
            Ok(bytes) => csv_response(bytes, "water_samples.csv"),
            Err(error) => {
                error_response(InterfaceError::Internal { message: error.to_string() })
            }
        },
        Err(response) => response,
    }
}

// ---------------------------------------------------------------------------
// HTML handlers
// ---------------------------------------------------------------------------

const TOP_ZONES_SHOWN: usize = 10;

fn report_data(outcome: &FilterOutcome, target: SurveyTarget) -> serde_json::Value {
    let kpis = compute_kpis(&outcome.households, target.households);
    let ranking = compute_zone_ranking(&outcome.households);
    let insights =
        generate_insights(&outcome.households, &outcome.samples, target.households);

    serde_json::json!({
        "generated_at": Utc::now().to_rfc3339(),
        "period": {
            "start": outcome.spec.start.to_string(),
            "end": outcome.spec.end.to_string(),
        },
        "zone_count": outcome.spec.zones.len(),
        "kpis": kpis,
        "needs": compute_need_totals(&outcome.households),
        "zones": ranking.iter().take(TOP_ZONES_SHOWN).collect::<Vec<_>>(),
        "insights": insights,
    })
}

async fn index_page(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let (outcome, target) = match filtered(&state, query).await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let data = report_data(&outcome, target);
    let mut context = Context::new();
    context.insert("kpis", &data["kpis"]);
    context.insert("needs", &data["needs"]);
    context.insert("zones", &data["zones"]);
    context.insert("insights", &data["insights"]);
    context.insert("period_start", &data["period"]["start"]);
    context.insert("period_end", &data["period"]["end"]);
    context.insert("zone_count", &data["zone_count"]);

    match state.templates.render("index.html", &context) {
        Ok(html) => Html(html).into_response(),
        Err(error) => {
            error_response(InterfaceError::Internal { message: error.to_string() })
        }
    }
}

async fn download_report(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let (outcome, target) = match filtered(&state, query).await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let data = report_data(&outcome, target);
    match state.reports.generate_summary(&data).await {
        Ok(result) => result.into_response("synthesis_report.pdf"),
        Err(error) => {
            error_response(InterfaceError::Internal { message: error.to_string() })
        }
    }
}
