//! Headline KPI aggregation over a filtered household collection.

use serde::{Deserialize, Serialize};

use crate::domain::household::{Household, NeedKind};

/// Households reporting at least this many needs count as multi-need.
pub const MULTI_NEED_THRESHOLD: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    pub pct_water: f64,
    pub pct_sanitation: f64,
    pub pct_schooling: f64,
    pub pct_multi_need: f64,
    pub surveyed: u64,
    pub target: i64,
}

/// Reduce a filtered collection into headline percentages. An empty
/// collection yields zero percentages and keeps the target untouched;
/// nothing here can divide by zero.
pub fn compute_kpis(households: &[Household], target: i64) -> KpiSet {
    if households.is_empty() {
        return KpiSet {
            pct_water: 0.0,
            pct_sanitation: 0.0,
            pct_schooling: 0.0,
            pct_multi_need: 0.0,
            surveyed: 0,
            target,
        };
    }

    let total = households.len() as f64;
    let share = |count: usize| 100.0 * count as f64 / total;

    KpiSet {
        pct_water: share(households.iter().filter(|h| h.water_improved.is_set()).count()),
        pct_sanitation: share(households.iter().filter(|h| h.sanitation.is_set()).count()),
        pct_schooling: share(households.iter().filter(|h| h.children_schooling.is_set()).count()),
        pct_multi_need: share(
            households.iter().filter(|h| h.need_count() >= MULTI_NEED_THRESHOLD).count(),
        ),
        surveyed: households.len() as u64,
        target,
    }
}

/// How many households report each need kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedTotals {
    pub water: u64,
    pub sanitation: u64,
    pub housing: u64,
    pub education: u64,
    pub health: u64,
    pub economic: u64,
}

pub fn compute_need_totals(households: &[Household]) -> NeedTotals {
    let count =
        |kind: NeedKind| households.iter().filter(|h| h.needs.get(kind).is_set()).count() as u64;

    NeedTotals {
        water: count(NeedKind::Water),
        sanitation: count(NeedKind::Sanitation),
        housing: count(NeedKind::Housing),
        education: count(NeedKind::Education),
        health: count(NeedKind::Health),
        economic: count(NeedKind::Economic),
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_kpis, compute_need_totals, KpiSet, NeedTotals};
    use crate::domain::household::{Flag, Household, HouseholdId, NeedFlags, Vulnerability};

    fn household(water: Flag, sanitation: Flag, needs: NeedFlags) -> Household {
        Household {
            id: HouseholdId(0),
            collected_at: None,
            zone: "Vekky".to_string(),
            location: None,
            household_size: None,
            main_activity: None,
            vulnerability: Vulnerability::Medium,
            water_improved: water,
            sanitation,
            children_schooling: Flag(None),
            health_access: Flag(None),
            needs,
            notes: None,
        }
    }

    #[test]
    fn empty_collection_yields_exact_zero_defaults() {
        let kpis = compute_kpis(&[], 1000);
        assert_eq!(
            kpis,
            KpiSet {
                pct_water: 0.0,
                pct_sanitation: 0.0,
                pct_schooling: 0.0,
                pct_multi_need: 0.0,
                surveyed: 0,
                target: 1000,
            }
        );
    }

    #[test]
    fn three_of_ten_households_with_water_gives_thirty_percent() {
        let mut rows = Vec::new();
        for index in 0..10 {
            let water = Flag(Some(index < 3));
            rows.push(household(water, Flag(None), NeedFlags::default()));
        }

        let kpis = compute_kpis(&rows, 500);

        assert_eq!(kpis.pct_water, 30.0);
        assert_eq!(kpis.surveyed, 10);
        assert_eq!(kpis.target, 500);
    }

    #[test]
    fn null_flags_count_as_unserved() {
        let rows = vec![
            household(Flag(None), Flag(None), NeedFlags::default()),
            household(Flag(Some(true)), Flag(Some(true)), NeedFlags::default()),
        ];

        let kpis = compute_kpis(&rows, 100);

        assert_eq!(kpis.pct_water, 50.0);
        assert_eq!(kpis.pct_sanitation, 50.0);
    }

    #[test]
    fn multi_need_share_counts_three_or_more_needs() {
        let heavy = NeedFlags {
            water: true.into(),
            sanitation: true.into(),
            housing: true.into(),
            ..NeedFlags::default()
        };
        let light = NeedFlags { water: true.into(), ..NeedFlags::default() };

        let rows = vec![
            household(Flag(None), Flag(None), heavy),
            household(Flag(None), Flag(None), light),
            household(Flag(None), Flag(None), light),
        ];

        let kpis = compute_kpis(&rows, 100);

        assert!((kpis.pct_multi_need - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn need_totals_count_set_flags_per_kind() {
        let both = NeedFlags {
            water: true.into(),
            education: true.into(),
            ..NeedFlags::default()
        };
        let water_only = NeedFlags { water: true.into(), ..NeedFlags::default() };

        let rows = vec![
            household(Flag(None), Flag(None), both),
            household(Flag(None), Flag(None), water_only),
            household(Flag(None), Flag(None), NeedFlags::default()),
        ];

        let totals = compute_need_totals(&rows);

        assert_eq!(
            totals,
            NeedTotals { water: 2, education: 1, ..NeedTotals::default() }
        );
    }
}
