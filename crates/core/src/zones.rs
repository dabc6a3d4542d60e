//! Zone-level aggregation and composite prioritization scoring.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::household::{Household, Vulnerability};

/// Weights for the composite zone score. Vulnerability carries the most
/// weight, the sanitation gap comes next, and needs breadth is scaled onto
/// a comparable 0-60 range before its weight applies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreWeights {
    pub high_vulnerability: f64,
    pub missing_sanitation: f64,
    pub need_breadth: f64,
}

pub const SCORE_WEIGHTS: ScoreWeights =
    ScoreWeights { high_vulnerability: 0.45, missing_sanitation: 0.35, need_breadth: 0.20 };

/// Maps the 0-6 mean need count onto a percentage-like scale.
const NEED_SCALE: f64 = 10.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneAggregate {
    pub zone: String,
    pub household_count: u64,
    pub high_vuln_pct: f64,
    pub no_sanitation_pct: f64,
    pub mean_need_count: f64,
    pub score: f64,
}

impl ZoneAggregate {
    pub fn composite_score(
        high_vuln_pct: f64,
        no_sanitation_pct: f64,
        mean_need_count: f64,
    ) -> f64 {
        high_vuln_pct * SCORE_WEIGHTS.high_vulnerability
            + no_sanitation_pct * SCORE_WEIGHTS.missing_sanitation
            + mean_need_count * NEED_SCALE * SCORE_WEIGHTS.need_breadth
    }
}

#[derive(Default)]
struct ZoneAccumulator {
    households: u64,
    high_vulnerability: u64,
    missing_sanitation: u64,
    need_total: u64,
}

/// Group a filtered collection by zone and rank by composite score,
/// descending. Ties keep lexical zone order (the grouping map iterates
/// sorted and the sort is stable). Empty input yields an empty ranking.
pub fn compute_zone_ranking(households: &[Household]) -> Vec<ZoneAggregate> {
    let mut groups: BTreeMap<&str, ZoneAccumulator> = BTreeMap::new();

    for household in households {
        let entry = groups.entry(household.zone.as_str()).or_default();
        entry.households += 1;
        entry.high_vulnerability += u64::from(household.vulnerability == Vulnerability::High);
        entry.missing_sanitation += u64::from(!household.sanitation.is_set());
        entry.need_total += u64::from(household.need_count());
    }

    let mut ranking: Vec<ZoneAggregate> = groups
        .into_iter()
        .map(|(zone, acc)| {
            let count = acc.households as f64;
            let high_vuln_pct = 100.0 * acc.high_vulnerability as f64 / count;
            let no_sanitation_pct = 100.0 * acc.missing_sanitation as f64 / count;
            let mean_need_count = acc.need_total as f64 / count;
            ZoneAggregate {
                zone: zone.to_string(),
                household_count: acc.households,
                high_vuln_pct,
                no_sanitation_pct,
                mean_need_count,
                score: ZoneAggregate::composite_score(
                    high_vuln_pct,
                    no_sanitation_pct,
                    mean_need_count,
                ),
            }
        })
        .collect();

    ranking.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranking
}

#[cfg(test)]
mod tests {
    use super::{compute_zone_ranking, ZoneAggregate};
    use crate::domain::household::{Flag, Household, HouseholdId, NeedFlags, Vulnerability};

    fn household(zone: &str, vulnerability: Vulnerability, sanitation: Flag, needs: u8) -> Household {
        let mut flags = NeedFlags::default();
        if needs >= 1 {
            flags.water = true.into();
        }
        if needs >= 2 {
            flags.sanitation = true.into();
        }
        if needs >= 3 {
            flags.housing = true.into();
        }
        if needs >= 4 {
            flags.education = true.into();
        }
        Household {
            id: HouseholdId(0),
            collected_at: None,
            zone: zone.to_string(),
            location: None,
            household_size: None,
            main_activity: None,
            vulnerability,
            water_improved: Flag(None),
            sanitation,
            children_schooling: Flag(None),
            health_access: Flag(None),
            needs: flags,
            notes: None,
        }
    }

    #[test]
    fn empty_input_yields_empty_ranking() {
        assert!(compute_zone_ranking(&[]).is_empty());
    }

    #[test]
    fn composite_score_matches_documented_weights() {
        // 80 * 0.45 + 60 * 0.35 + 2 * 10 * 0.20 = 36 + 21 + 4
        assert_eq!(ZoneAggregate::composite_score(80.0, 60.0, 2.0), 61.0);
    }

    #[test]
    fn zone_aggregates_combine_vulnerability_sanitation_and_needs() {
        let rows = vec![
            household("Vekky", Vulnerability::High, Flag(Some(false)), 2),
            household("Vekky", Vulnerability::Low, Flag(Some(true)), 2),
        ];

        let ranking = compute_zone_ranking(&rows);

        assert_eq!(ranking.len(), 1);
        let zone = &ranking[0];
        assert_eq!(zone.household_count, 2);
        assert_eq!(zone.high_vuln_pct, 50.0);
        assert_eq!(zone.no_sanitation_pct, 50.0);
        assert_eq!(zone.mean_need_count, 2.0);
        assert_eq!(zone.score, 50.0 * 0.45 + 50.0 * 0.35 + 2.0 * 10.0 * 0.20);
    }

    #[test]
    fn null_sanitation_counts_as_missing() {
        let rows = vec![household("Vekky", Vulnerability::Low, Flag(None), 1)];
        let ranking = compute_zone_ranking(&rows);
        assert_eq!(ranking[0].no_sanitation_pct, 100.0);
    }

    #[test]
    fn ranking_is_descending_with_lexical_tie_break() {
        let rows = vec![
            household("Calm", Vulnerability::Low, Flag(Some(true)), 0),
            household("Busy", Vulnerability::High, Flag(Some(false)), 4),
            // Two zones with identical profiles tie on score.
            household("Beta", Vulnerability::Medium, Flag(Some(false)), 1),
            household("Alpha", Vulnerability::Medium, Flag(Some(false)), 1),
        ];

        let ranking = compute_zone_ranking(&rows);
        let zones: Vec<&str> = ranking.iter().map(|z| z.zone.as_str()).collect();

        assert_eq!(zones, vec!["Busy", "Alpha", "Beta", "Calm"]);
        for pair in ranking.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
