use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::household::GeoPoint;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Dry,
    Rains1,
    Rains2,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Season::Dry => "dry",
            Season::Rains1 => "rains1",
            Season::Rains2 => "rains2",
        }
    }
}

impl std::str::FromStr for Season {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dry" => Ok(Self::Dry),
            "rains1" => Ok(Self::Rains1),
            "rains2" => Ok(Self::Rains2),
            other => Err(DomainError::UnknownValue { field: "season", value: other.to_string() }),
        }
    }
}

/// Three-way water-quality classification, derived once at ingestion and
/// stored with the sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Compliant,
    Watch,
    AtRisk,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Compliant => "compliant",
            RiskLevel::Watch => "watch",
            RiskLevel::AtRisk => "at_risk",
        }
    }

    /// Simplified lab thresholds (to be aligned with local/WHO norms).
    /// A sample without an E. coli reading cannot be cleared.
    pub fn classify(ph: Option<f64>, turbidity: Option<f64>, e_coli: Option<i64>) -> RiskLevel {
        let Some(e_coli) = e_coli else {
            return RiskLevel::Watch;
        };
        let ph_out_of_band = ph.map(|value| !(6.0..=8.5).contains(&value)).unwrap_or(false);
        let turbidity = turbidity.unwrap_or(0.0);

        if e_coli > 100 || turbidity > 20.0 || ph_out_of_band {
            RiskLevel::AtRisk
        } else if e_coli > 10 || turbidity > 10.0 {
            RiskLevel::Watch
        } else {
            RiskLevel::Compliant
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compliant" => Ok(Self::Compliant),
            "watch" => Ok(Self::Watch),
            "at_risk" => Ok(Self::AtRisk),
            other => {
                Err(DomainError::UnknownValue { field: "risk_level", value: other.to_string() })
            }
        }
    }
}

/// One water-quality sampling record. `risk_level` is nullable to tolerate
/// legacy rows ingested before classification existed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaterSample {
    pub id: SampleId,
    pub collected_at: Option<DateTime<Utc>>,
    pub zone: String,
    pub location: Option<GeoPoint>,
    pub season: Option<Season>,
    pub ph: Option<f64>,
    pub turbidity: Option<f64>,
    pub conductivity: Option<f64>,
    pub e_coli: Option<i64>,
    pub coliforms: Option<i64>,
    pub risk_level: Option<RiskLevel>,
    pub comments: Option<String>,
}

/// Insert payload for a water sample; the store assigns the id and the
/// ingestion path derives the risk level from the measurements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewWaterSample {
    pub collected_at: DateTime<Utc>,
    pub zone: String,
    pub location: Option<GeoPoint>,
    pub season: Option<Season>,
    pub ph: Option<f64>,
    pub turbidity: Option<f64>,
    pub conductivity: Option<f64>,
    pub e_coli: Option<i64>,
    pub coliforms: Option<i64>,
    pub comments: Option<String>,
}

impl NewWaterSample {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::classify(self.ph, self.turbidity, self.e_coli)
    }
}
