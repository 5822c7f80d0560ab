//! Canonical metric catalogue.
//!
//! Every metric the pipeline ingests is named here. Storage rows, provider
//! adapters and the alert engine all speak in these identifiers — vendor
//! field names never leave the provider crate.

use serde::{Deserialize, Serialize};

/// A physiological metric tracked per user, per provider, per local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Steps,
    Distance,
    Calories,
    HeartRate,
    HeartRateAvg,
    HeartRateMin,
    HeartRateMax,
    RestingHeartRate,
    SleepDuration,
    Weight,
    Spo2,
    BodyTemperature,
    SkinTemperature,
}

impl Metric {
    /// Every tracked metric, in catalogue order.
    pub const ALL: [Metric; 13] = [
        Metric::Steps,
        Metric::Distance,
        Metric::Calories,
        Metric::HeartRate,
        Metric::HeartRateAvg,
        Metric::HeartRateMin,
        Metric::HeartRateMax,
        Metric::RestingHeartRate,
        Metric::SleepDuration,
        Metric::Weight,
        Metric::Spo2,
        Metric::BodyTemperature,
        Metric::SkinTemperature,
    ];

    /// Canonical storage name (the `metric` column value).
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Steps => "steps",
            Metric::Distance => "distance_m",
            Metric::Calories => "calories",
            Metric::HeartRate => "heart_rate",
            Metric::HeartRateAvg => "hr_avg",
            Metric::HeartRateMin => "hr_min",
            Metric::HeartRateMax => "hr_max",
            Metric::RestingHeartRate => "resting_hr",
            Metric::SleepDuration => "sleep_minutes",
            Metric::Weight => "weight_kg",
            Metric::Spo2 => "spo2_pct",
            Metric::BodyTemperature => "temp_body_c",
            Metric::SkinTemperature => "temp_skin_c",
        }
    }

    /// Unit recorded alongside every stored value.
    pub fn unit(self) -> &'static str {
        match self {
            Metric::Steps => "count",
            Metric::Distance => "m",
            Metric::Calories => "kcal",
            Metric::HeartRate
            | Metric::HeartRateAvg
            | Metric::HeartRateMin
            | Metric::HeartRateMax
            | Metric::RestingHeartRate => "bpm",
            Metric::SleepDuration => "min",
            Metric::Weight => "kg",
            Metric::Spo2 => "%",
            Metric::BodyTemperature | Metric::SkinTemperature => "C",
        }
    }

    /// Whether the daily value is an additive counter.
    ///
    /// Additive counters reconcile as `max(roll-up, intraday sum)` and are
    /// persisted with the monotonic (set-if-greater) upsert. Everything
    /// else takes the roll-up value verbatim — summing intraday samples of
    /// a non-additive metric would double count.
    pub fn is_additive(self) -> bool {
        matches!(self, Metric::Steps | Metric::Distance)
    }

    /// Reverse lookup from a stored `metric` column value.
    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_names_round_trip() {
        for m in Metric::ALL {
            assert_eq!(Metric::from_name(m.as_str()), Some(m));
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Metric::from_name("vo2_max"), None);
    }

    #[test]
    fn only_counters_are_additive() {
        let additive: Vec<_> = Metric::ALL.into_iter().filter(|m| m.is_additive()).collect();
        assert_eq!(additive, vec![Metric::Steps, Metric::Distance]);
    }
}
