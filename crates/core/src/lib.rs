pub mod config;
pub mod domain;
pub mod errors;
pub mod filters;
pub mod insights;
pub mod kpi;
pub mod zones;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::household::{
    Flag, GeoPoint, Household, HouseholdId, NeedFlags, NeedKind, NewHousehold, Vulnerability,
};
pub use domain::target::{SurveyTarget, DEFAULT_HOUSEHOLD_TARGET};
pub use domain::water::{NewWaterSample, RiskLevel, SampleId, Season, WaterSample};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use filters::{apply_filters, FilterOutcome, FilterOverrides, FilterSpec};
pub use insights::{generate_insights, Insight, InsightLevel, MAX_INSIGHTS};
pub use kpi::{compute_kpis, compute_need_totals, KpiSet, NeedTotals, MULTI_NEED_THRESHOLD};
pub use zones::{compute_zone_ranking, ScoreWeights, ZoneAggregate, SCORE_WEIGHTS};
