use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{CoreError, Result};

string_enum! {
    pub enum HealthMetric ("metric") {
        Water => "water",
        Sleep => "sleep",
        Mood => "mood",
        Exercise => "exercise",
        Weight => "weight",
        Steps => "steps",
        Meditation => "meditation",
    }
}

impl HealthMetric {
    pub fn default_unit(&self) -> &'static str {
        match self {
            HealthMetric::Water => "ml",
            HealthMetric::Sleep => "hours",
            HealthMetric::Mood => "score",
            HealthMetric::Exercise | HealthMetric::Meditation => "minutes",
            HealthMetric::Weight => "kg",
            HealthMetric::Steps => "steps",
        }
    }

    /// Inclusive bounds; weight excludes zero.
    fn bounds(&self) -> (f64, f64) {
        match self {
            HealthMetric::Water => (0.0, 10_000.0),
            HealthMetric::Sleep => (0.0, 24.0),
            HealthMetric::Mood => (1.0, 10.0),
            HealthMetric::Exercise | HealthMetric::Meditation => (0.0, 1440.0),
            HealthMetric::Weight => (0.0, 500.0),
            HealthMetric::Steps => (0.0, 200_000.0),
        }
    }

    /// Checks that `value` is plausible for this metric.
    pub fn validate(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(CoreError::validation(format!(
                "{} value must be a finite number",
                self.as_str()
            )));
        }
        let (min, max) = self.bounds();
        let below = if *self == HealthMetric::Weight {
            value <= min
        } else {
            value < min
        };
        if below || value > max {
            return Err(CoreError::validation(format!(
                "{} value {value} is outside {min}..={max}",
                self.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub metric: HealthMetric,
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
