use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HouseholdId(pub i64);

/// Ordinal vulnerability classification assigned per household during the
/// participatory survey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vulnerability {
    Low,
    Medium,
    High,
}

impl Vulnerability {
    pub const ALL: [Vulnerability; 3] =
        [Vulnerability::Low, Vulnerability::Medium, Vulnerability::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Vulnerability::Low => "low",
            Vulnerability::Medium => "medium",
            Vulnerability::High => "high",
        }
    }
}

impl std::str::FromStr for Vulnerability {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(DomainError::UnknownValue {
                field: "vulnerability",
                value: other.to_string(),
            }),
        }
    }
}

/// A nullable survey flag. Absent answers count as zero everywhere in the
/// aggregation pipeline, so the coercion lives here instead of being
/// scattered across the aggregators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flag(pub Option<bool>);

impl Flag {
    pub fn or_zero(self) -> u8 {
        match self.0 {
            Some(true) => 1,
            Some(false) | None => 0,
        }
    }

    pub fn is_set(self) -> bool {
        self.or_zero() == 1
    }
}

impl From<bool> for Flag {
    fn from(value: bool) -> Self {
        Flag(Some(value))
    }
}

impl From<Option<bool>> for Flag {
    fn from(value: Option<bool>) -> Self {
        Flag(value)
    }
}

/// The six self-reported need categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    Water,
    Sanitation,
    Housing,
    Education,
    Health,
    Economic,
}

impl NeedKind {
    pub const ALL: [NeedKind; 6] = [
        NeedKind::Water,
        NeedKind::Sanitation,
        NeedKind::Housing,
        NeedKind::Education,
        NeedKind::Health,
        NeedKind::Economic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NeedKind::Water => "water",
            NeedKind::Sanitation => "sanitation",
            NeedKind::Housing => "housing",
            NeedKind::Education => "education",
            NeedKind::Health => "health",
            NeedKind::Economic => "economic",
        }
    }
}

impl std::str::FromStr for NeedKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "water" => Ok(Self::Water),
            "sanitation" => Ok(Self::Sanitation),
            "housing" => Ok(Self::Housing),
            "education" => Ok(Self::Education),
            "health" => Ok(Self::Health),
            "economic" => Ok(Self::Economic),
            other => Err(DomainError::UnknownValue { field: "need", value: other.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedFlags {
    pub water: Flag,
    pub sanitation: Flag,
    pub housing: Flag,
    pub education: Flag,
    pub health: Flag,
    pub economic: Flag,
}

impl NeedFlags {
    pub fn get(&self, kind: NeedKind) -> Flag {
        match kind {
            NeedKind::Water => self.water,
            NeedKind::Sanitation => self.sanitation,
            NeedKind::Housing => self.housing,
            NeedKind::Education => self.education,
            NeedKind::Health => self.health,
            NeedKind::Economic => self.economic,
        }
    }

    /// Number of need flags set, always in 0..=6. Null flags count as zero.
    pub fn count(&self) -> u8 {
        NeedKind::ALL.iter().map(|kind| self.get(*kind).or_zero()).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One household survey record as read from the store. `collected_at` is
/// `None` when the stored timestamp failed to parse; such rows never match a
/// date-range filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub id: HouseholdId,
    pub collected_at: Option<DateTime<Utc>>,
    pub zone: String,
    pub location: Option<GeoPoint>,
    pub household_size: Option<u32>,
    pub main_activity: Option<String>,
    pub vulnerability: Vulnerability,
    pub water_improved: Flag,
    pub sanitation: Flag,
    pub children_schooling: Flag,
    pub health_access: Flag,
    pub needs: NeedFlags,
    pub notes: Option<String>,
}

impl Household {
    pub fn need_count(&self) -> u8 {
        self.needs.count()
    }
}

/// Insert payload for a household record; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewHousehold {
    pub collected_at: DateTime<Utc>,
    pub zone: String,
    pub location: Option<GeoPoint>,
    pub household_size: Option<u32>,
    pub main_activity: Option<String>,
    pub vulnerability: Vulnerability,
    pub water_improved: Flag,
    pub sanitation: Flag,
    pub children_schooling: Flag,
    pub health_access: Flag,
    pub needs: NeedFlags,
    pub notes: Option<String>,
}
