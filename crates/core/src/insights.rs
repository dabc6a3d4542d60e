//! Rule-based recommendation engine. An ordered cascade of independent
//! threshold checks over the filtered collections; evaluation order is
//! fixed and the output is never reordered by severity.

use serde::{Deserialize, Serialize};

use crate::domain::household::Household;
use crate::domain::water::{RiskLevel, WaterSample};
use crate::kpi::compute_kpis;
use crate::zones::compute_zone_ranking;

/// Hard cap on emitted recommendations, applied in rule order.
pub const MAX_INSIGHTS: usize = 6;

const WATER_CRITICAL_PCT: f64 = 50.0;
const WATER_ATTENTION_PCT: f64 = 70.0;
const SANITATION_CRITICAL_PCT: f64 = 40.0;
const MULTI_NEED_ATTENTION_PCT: f64 = 35.0;
const AT_RISK_CRITICAL_SHARE: f64 = 25.0;
const WATCH_ATTENTION_SHARE: f64 = 40.0;
const TOP_ZONES_NAMED: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightLevel {
    Ok,
    Attention,
    Critical,
}

impl InsightLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightLevel::Ok => "ok",
            InsightLevel::Attention => "attention",
            InsightLevel::Critical => "critical",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub level: InsightLevel,
    pub message: String,
}

impl Insight {
    fn new(level: InsightLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }
}

/// Evaluate the fixed rule cascade over the filtered collections. Returns at
/// most [`MAX_INSIGHTS`] entries in rule order. Risk shares only consider
/// samples with a stored risk level; an empty sample collection skips the
/// water-quality rule entirely.
pub fn generate_insights(
    households: &[Household],
    samples: &[WaterSample],
    target: i64,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if !households.is_empty() {
        let kpis = compute_kpis(households, target);

        if kpis.pct_water < WATER_CRITICAL_PCT {
            insights.push(Insight::new(
                InsightLevel::Critical,
                "Improved water access below 50%: prioritize WASH interventions in the highest-scoring zones.",
            ));
        } else if kpis.pct_water < WATER_ATTENTION_PCT {
            insights.push(Insight::new(
                InsightLevel::Attention,
                "Water access needs watching: target the zones where vulnerability runs high.",
            ));
        }

        if kpis.pct_sanitation < SANITATION_CRITICAL_PCT {
            insights.push(Insight::new(
                InsightLevel::Critical,
                "Sanitation coverage is low: launch quick actions (latrines, awareness, waste management).",
            ));
        }

        if kpis.pct_multi_need > MULTI_NEED_ATTENTION_PCT {
            insights.push(Insight::new(
                InsightLevel::Attention,
                "Many households report 3+ needs: plan a multi-sector investment package per zone.",
            ));
        }

        let ranking = compute_zone_ranking(households);
        if !ranking.is_empty() {
            let top: Vec<&str> =
                ranking.iter().take(TOP_ZONES_NAMED).map(|z| z.zone.as_str()).collect();
            insights.push(Insight::new(
                InsightLevel::Ok,
                format!("Top priority zones (composite score): {}.", top.join(", ")),
            ));
        }
    }

    if !samples.is_empty() {
        let rated: Vec<RiskLevel> = samples.iter().filter_map(|s| s.risk_level).collect();
        if !rated.is_empty() {
            let total = rated.len() as f64;
            let share = |level: RiskLevel| {
                100.0 * rated.iter().filter(|r| **r == level).count() as f64 / total
            };

            if share(RiskLevel::AtRisk) > AT_RISK_CRITICAL_SHARE {
                insights.push(Insight::new(
                    InsightLevel::Critical,
                    "Water quality: high share of at-risk sampling points. Activate the prevention plan (treatment, alternative points, alerts).",
                ));
            } else if share(RiskLevel::Watch) > WATCH_ATTENTION_SHARE {
                insights.push(Insight::new(
                    InsightLevel::Attention,
                    "Water quality: several points to watch. Increase sampling frequency in sensitive zones.",
                ));
            }
        }
    }

    if insights.is_empty() {
        insights.push(Insight::new(
            InsightLevel::Ok,
            "No critical signal under the current filters. Keep collecting and consolidate zone coverage.",
        ));
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}

#[cfg(test)]
mod tests {
    use super::{generate_insights, InsightLevel, MAX_INSIGHTS};
    use crate::domain::household::{Flag, Household, HouseholdId, NeedFlags, Vulnerability};
    use crate::domain::water::{RiskLevel, SampleId, WaterSample};

    fn household(zone: &str, water: bool, sanitation: bool, needs: u8) -> Household {
        let mut flags = NeedFlags::default();
        if needs >= 1 {
            flags.water = true.into();
        }
        if needs >= 2 {
            flags.housing = true.into();
        }
        if needs >= 3 {
            flags.health = true.into();
        }
        Household {
            id: HouseholdId(0),
            collected_at: None,
            zone: zone.to_string(),
            location: None,
            household_size: None,
            main_activity: None,
            vulnerability: Vulnerability::Medium,
            water_improved: water.into(),
            sanitation: sanitation.into(),
            children_schooling: Flag(None),
            health_access: Flag(None),
            needs: flags,
            notes: None,
        }
    }

    fn sample(risk: Option<RiskLevel>) -> WaterSample {
        WaterSample {
            id: SampleId(0),
            collected_at: None,
            zone: "Vekky".to_string(),
            location: None,
            season: None,
            ph: None,
            turbidity: None,
            conductivity: None,
            e_coli: None,
            coliforms: None,
            risk_level: risk,
            comments: None,
        }
    }

    #[test]
    fn thirty_percent_water_access_is_critical() {
        let mut rows = Vec::new();
        for index in 0..10 {
            rows.push(household("Vekky", index < 3, true, 1));
        }

        let insights = generate_insights(&rows, &[], 1000);

        assert_eq!(insights[0].level, InsightLevel::Critical);
        assert!(insights[0].message.contains("water access below 50%"));
    }

    #[test]
    fn sixty_percent_water_access_is_attention() {
        let mut rows = Vec::new();
        for index in 0..10 {
            rows.push(household("Vekky", index < 6, true, 1));
        }

        let insights = generate_insights(&rows, &[], 1000);

        assert_eq!(insights[0].level, InsightLevel::Attention);
        assert!(insights[0].message.contains("Water access"));
    }

    #[test]
    fn non_empty_ranking_always_names_top_zones() {
        let rows = vec![household("Vekky", true, true, 1)];

        let insights = generate_insights(&rows, &[], 1000);

        assert!(insights
            .iter()
            .any(|i| i.level == InsightLevel::Ok && i.message.contains("Vekky")));
    }

    #[test]
    fn thirty_percent_at_risk_samples_is_critical() {
        let samples = vec![
            sample(Some(RiskLevel::AtRisk)),
            sample(Some(RiskLevel::AtRisk)),
            sample(Some(RiskLevel::AtRisk)),
            sample(Some(RiskLevel::Compliant)),
            sample(Some(RiskLevel::Compliant)),
            sample(Some(RiskLevel::Compliant)),
            sample(Some(RiskLevel::Compliant)),
            sample(Some(RiskLevel::Compliant)),
            sample(Some(RiskLevel::Compliant)),
            sample(Some(RiskLevel::Compliant)),
        ];

        let insights = generate_insights(&[], &samples, 1000);

        assert_eq!(insights[0].level, InsightLevel::Critical);
        assert!(insights[0].message.contains("Water quality"));
    }

    #[test]
    fn risk_shares_ignore_unrated_samples() {
        // One at-risk out of two rated samples: 50% > 25%.
        let samples =
            vec![sample(Some(RiskLevel::AtRisk)), sample(Some(RiskLevel::Compliant)), sample(None)];

        let insights = generate_insights(&[], &samples, 1000);

        assert_eq!(insights[0].level, InsightLevel::Critical);
    }

    #[test]
    fn empty_inputs_fall_back_to_a_single_ok_message() {
        let insights = generate_insights(&[], &[], 1000);

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].level, InsightLevel::Ok);
        assert!(insights[0].message.contains("No critical signal"));
    }

    #[test]
    fn output_is_capped_and_keeps_rule_order() {
        // Trip every household rule plus the water-quality rule.
        let mut rows = Vec::new();
        for _ in 0..10 {
            rows.push(household("Vekky", false, false, 3));
        }
        let samples = vec![sample(Some(RiskLevel::AtRisk)), sample(Some(RiskLevel::AtRisk))];

        let insights = generate_insights(&rows, &samples, 1000);

        assert!(insights.len() <= MAX_INSIGHTS);
        let levels: Vec<InsightLevel> = insights.iter().map(|i| i.level).collect();
        assert_eq!(
            levels,
            vec![
                InsightLevel::Critical,
                InsightLevel::Critical,
                InsightLevel::Attention,
                InsightLevel::Ok,
                InsightLevel::Critical,
            ]
        );
    }
}
