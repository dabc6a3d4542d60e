use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Planned total number of household surveys for the campaign.
pub const DEFAULT_HOUSEHOLD_TARGET: i64 = 1000;

/// Process-wide survey target. A single mutable row in the store; updates
/// replace the row wholesale (last writer wins).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurveyTarget {
    pub households: i64,
    pub updated_at: DateTime<Utc>,
}

impl SurveyTarget {
    pub fn new(households: i64, updated_at: DateTime<Utc>) -> Self {
        Self { households, updated_at }
    }
}
