//! Filter engine narrowing the raw household and water-sample collections
//! before aggregation.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::household::{Household, NeedKind, Vulnerability};
use crate::domain::water::WaterSample;

/// Fully-resolved filter selection. The default spec (no user narrowing)
/// covers every observed zone, the full observed date span, all three
/// vulnerability levels, and all six need kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub zones: BTreeSet<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub vulnerability: BTreeSet<Vulnerability>,
    pub needs: BTreeSet<NeedKind>,
}

impl FilterSpec {
    /// Build the widest spec covering both raw collections. When neither
    /// collection carries a parsable date, the span collapses to `today`.
    pub fn effective(households: &[Household], samples: &[WaterSample], today: NaiveDate) -> Self {
        let zones = households
            .iter()
            .map(|h| h.zone.clone())
            .chain(samples.iter().map(|s| s.zone.clone()))
            .collect();

        let dates: Vec<NaiveDate> = households
            .iter()
            .filter_map(|h| h.collected_at)
            .chain(samples.iter().filter_map(|s| s.collected_at))
            .map(|at| at.date_naive())
            .collect();
        let start = dates.iter().min().copied().unwrap_or(today);
        let end = dates.iter().max().copied().unwrap_or(today);

        Self {
            zones,
            start,
            end,
            vulnerability: Vulnerability::ALL.into_iter().collect(),
            needs: NeedKind::ALL.into_iter().collect(),
        }
    }

    /// A household is retained when its zone, calendar date, and
    /// vulnerability level are all selected AND it carries at least one of
    /// the selected need flags. An empty need selection therefore matches no
    /// households.
    pub fn matches_household(&self, household: &Household) -> bool {
        if !self.zones.contains(&household.zone) {
            return false;
        }
        if !self.date_in_range(household.collected_at) {
            return false;
        }
        if !self.vulnerability.contains(&household.vulnerability) {
            return false;
        }
        let selected_needs: u32 =
            self.needs.iter().map(|kind| u32::from(household.needs.get(*kind).or_zero())).sum();
        selected_needs >= 1
    }

    /// Samples carry no vulnerability or need attributes; only zone and date
    /// apply.
    pub fn matches_sample(&self, sample: &WaterSample) -> bool {
        self.zones.contains(&sample.zone) && self.date_in_range(sample.collected_at)
    }

    /// Day-granularity inclusive range check. Rows whose timestamp failed to
    /// parse never match.
    fn date_in_range(&self, at: Option<DateTime<Utc>>) -> bool {
        match at {
            Some(at) => {
                let date = at.date_naive();
                date >= self.start && date <= self.end
            }
            None => false,
        }
    }
}

/// Caller-supplied narrowing; any `None` field falls back to the effective
/// default for that dimension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOverrides {
    pub zones: Option<Vec<String>>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub vulnerability: Option<Vec<Vulnerability>>,
    pub needs: Option<Vec<NeedKind>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterOutcome {
    pub households: Vec<Household>,
    pub samples: Vec<WaterSample>,
    pub spec: FilterSpec,
}

/// Narrow both collections and return them together with the filter spec
/// that was actually applied.
pub fn apply_filters(
    mut households: Vec<Household>,
    mut samples: Vec<WaterSample>,
    overrides: FilterOverrides,
    today: NaiveDate,
) -> FilterOutcome {
    let mut spec = FilterSpec::effective(&households, &samples, today);

    if let Some(zones) = overrides.zones {
        spec.zones = zones.into_iter().collect();
    }
    if let Some(start) = overrides.start {
        spec.start = start;
    }
    if let Some(end) = overrides.end {
        spec.end = end;
    }
    if let Some(vulnerability) = overrides.vulnerability {
        spec.vulnerability = vulnerability.into_iter().collect();
    }
    if let Some(needs) = overrides.needs {
        spec.needs = needs.into_iter().collect();
    }

    households.retain(|h| spec.matches_household(h));
    samples.retain(|s| spec.matches_sample(s));

    FilterOutcome { households, samples, spec }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{apply_filters, FilterOverrides, FilterSpec};
    use crate::domain::household::{Household, HouseholdId, NeedFlags, Vulnerability};
    use crate::domain::water::{SampleId, WaterSample};

    fn household(id: i64, zone: &str, day: u32, vulnerability: Vulnerability) -> Household {
        Household {
            id: HouseholdId(id),
            collected_at: Some(Utc.with_ymd_and_hms(2025, 6, day, 10, 0, 0).unwrap()),
            zone: zone.to_string(),
            location: None,
            household_size: Some(4),
            main_activity: Some("fishing".to_string()),
            vulnerability,
            water_improved: true.into(),
            sanitation: false.into(),
            children_schooling: true.into(),
            health_access: true.into(),
            needs: NeedFlags { water: true.into(), ..NeedFlags::default() },
            notes: None,
        }
    }

    fn sample(id: i64, zone: &str, day: u32) -> WaterSample {
        WaterSample {
            id: SampleId(id),
            collected_at: Some(Utc.with_ymd_and_hms(2025, 6, day, 8, 0, 0).unwrap()),
            zone: zone.to_string(),
            location: None,
            season: None,
            ph: Some(7.0),
            turbidity: Some(3.0),
            conductivity: None,
            e_coli: Some(4),
            coliforms: None,
            risk_level: None,
            comments: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    #[test]
    fn effective_spec_spans_both_collections() {
        let households = vec![household(1, "Vekky", 5, Vulnerability::Low)];
        let samples = vec![sample(1, "Ganvie-Centre", 20)];

        let spec = FilterSpec::effective(&households, &samples, today());

        assert!(spec.zones.contains("Vekky"));
        assert!(spec.zones.contains("Ganvie-Centre"));
        assert_eq!(spec.start, NaiveDate::from_ymd_opt(2025, 6, 5).unwrap());
        assert_eq!(spec.end, NaiveDate::from_ymd_opt(2025, 6, 20).unwrap());
        assert_eq!(spec.vulnerability.len(), 3);
        assert_eq!(spec.needs.len(), 6);
    }

    #[test]
    fn effective_spec_collapses_to_today_when_empty() {
        let spec = FilterSpec::effective(&[], &[], today());
        assert_eq!(spec.start, today());
        assert_eq!(spec.end, today());
        assert!(spec.zones.is_empty());
    }

    #[test]
    fn zone_and_vulnerability_narrowing_apply_to_households_only_zone_to_samples() {
        let households = vec![
            household(1, "Vekky", 5, Vulnerability::High),
            household(2, "Ganvie-Centre", 6, Vulnerability::Low),
        ];
        let samples = vec![sample(1, "Vekky", 5), sample(2, "Ganvie-Centre", 6)];

        let outcome = apply_filters(
            households,
            samples,
            FilterOverrides {
                zones: Some(vec!["Vekky".to_string()]),
                vulnerability: Some(vec![Vulnerability::High]),
                ..FilterOverrides::default()
            },
            today(),
        );

        assert_eq!(outcome.households.len(), 1);
        assert_eq!(outcome.households[0].id.0, 1);
        assert_eq!(outcome.samples.len(), 1);
        assert_eq!(outcome.samples[0].zone, "Vekky");
    }

    #[test]
    fn date_range_is_inclusive_by_calendar_day() {
        let households = vec![
            household(1, "Vekky", 5, Vulnerability::Low),
            household(2, "Vekky", 10, Vulnerability::Low),
            household(3, "Vekky", 15, Vulnerability::Low),
        ];

        let outcome = apply_filters(
            households,
            Vec::new(),
            FilterOverrides {
                start: Some(NaiveDate::from_ymd_opt(2025, 6, 5).unwrap()),
                end: Some(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()),
                ..FilterOverrides::default()
            },
            today(),
        );

        let ids: Vec<i64> = outcome.households.iter().map(|h| h.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn unparsable_timestamps_never_match_a_date_filter() {
        let mut row = household(1, "Vekky", 5, Vulnerability::Low);
        row.collected_at = None;

        let outcome = apply_filters(vec![row], Vec::new(), FilterOverrides::default(), today());

        assert!(outcome.households.is_empty());
    }

    #[test]
    fn empty_need_selection_matches_no_households() {
        let households = vec![household(1, "Vekky", 5, Vulnerability::Low)];

        let outcome = apply_filters(
            households,
            Vec::new(),
            FilterOverrides { needs: Some(Vec::new()), ..FilterOverrides::default() },
            today(),
        );

        assert!(outcome.households.is_empty());
    }

    #[test]
    fn household_without_selected_need_is_dropped() {
        let mut row = household(1, "Vekky", 5, Vulnerability::Low);
        row.needs = crate::domain::household::NeedFlags::default();

        let outcome = apply_filters(vec![row], Vec::new(), FilterOverrides::default(), today());

        assert!(outcome.households.is_empty());
    }
}
