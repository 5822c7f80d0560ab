//! Roll-up vs. intraday reconciliation.
//!
//! Pure logic — no provider or database access. The caller fetches the
//! daily roll-up and the intraday series and passes them in; [`reconcile`]
//! produces the canonical per-day record.
//!
//! The reconciliation rule for additive counters (steps, distance):
//! the canonical value is `max(roll-up, sum of intraday samples)`. The
//! roll-up is authoritative for settled days, but while a day is still in
//! progress the intraday sum is usually fresher than the provider's last
//! computed roll-up. Non-additive metrics take the roll-up verbatim.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::metric::Metric;
use crate::sample::Sample;
use crate::types::Timestamp;

/// A provider's own daily-aggregate reading, mapped to the canonical
/// model by the provider adapter. Absent fields were not observed —
/// absence is meaningful, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyRollUp {
    pub steps: Option<f64>,
    pub distance_m: Option<f64>,
    pub calories: Option<f64>,
    pub hr_avg: Option<f64>,
    pub hr_min: Option<f64>,
    pub hr_max: Option<f64>,
    pub resting_hr: Option<f64>,
    pub sleep_minutes: Option<f64>,
    pub weight_kg: Option<f64>,
    pub spo2_pct: Option<f64>,
    pub body_temp_c: Option<f64>,
    pub skin_temp_c: Option<f64>,
    /// IANA zone the provider bucketed this day in, when reported.
    pub timezone: Option<String>,
    /// Provider-side last-modified instant, when reported.
    pub source_updated_at: Option<Timestamp>,
}

impl DailyRollUp {
    fn value_of(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Steps => self.steps,
            Metric::Distance => self.distance_m,
            Metric::Calories => self.calories,
            // Raw heart rate has no daily roll-up form; it exists only as
            // intraday samples and the live current-reading cache.
            Metric::HeartRate => None,
            Metric::HeartRateAvg => self.hr_avg,
            Metric::HeartRateMin => self.hr_min,
            Metric::HeartRateMax => self.hr_max,
            Metric::RestingHeartRate => self.resting_hr,
            Metric::SleepDuration => self.sleep_minutes,
            Metric::Weight => self.weight_kg,
            Metric::Spo2 => self.spo2_pct,
            Metric::BodyTemperature => self.body_temp_c,
            Metric::SkinTemperature => self.skin_temp_c,
        }
    }
}

/// One reconciled metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalValue {
    pub metric: Metric,
    pub value: f64,
    pub unit: &'static str,
}

/// The canonical reconciled record for one (user, provider, day).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalDay {
    /// The local day the values belong to.
    pub date_local: NaiveDate,
    /// When this record was produced by lookback, the day originally
    /// requested; `None` for a direct hit.
    pub fallback_from: Option<NaiveDate>,
    /// IANA zone name used to bucket the day.
    pub tz: String,
    /// Reconciled values. Metrics with nothing observed are absent.
    pub values: Vec<CanonicalValue>,
    pub source_updated_at: Option<Timestamp>,
}

impl CanonicalDay {
    /// True when no metric carries a value — the signal that triggers
    /// fallback lookback in the normalizer.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reconciled value for one metric, if observed.
    pub fn value_of(&self, metric: Metric) -> Option<f64> {
        self.values
            .iter()
            .find(|v| v.metric == metric)
            .map(|v| v.value)
    }
}

/// Canonical value for an additive counter: `max(roll-up, intraday sum)`.
///
/// Returns `None` only when neither source observed anything. An empty
/// sample list contributes nothing (it is not a zero observation).
pub fn additive_value(rollup: Option<f64>, samples: &[Sample]) -> Option<f64> {
    let intraday_sum = if samples.is_empty() {
        None
    } else {
        Some(samples.iter().map(|s| s.value).sum::<f64>())
    };
    match (rollup, intraday_sum) {
        (Some(r), Some(i)) => Some(r.max(i)),
        (Some(r), None) => Some(r),
        (None, Some(i)) => Some(i),
        (None, None) => None,
    }
}

/// Reconcile one day's roll-up and intraday series into a canonical record.
pub fn reconcile(
    date_local: NaiveDate,
    tz: &str,
    rollup: &DailyRollUp,
    intraday: &HashMap<Metric, Vec<Sample>>,
) -> CanonicalDay {
    static EMPTY: Vec<Sample> = Vec::new();
    let mut values = Vec::new();

    for metric in Metric::ALL {
        let value = if metric.is_additive() {
            let samples = intraday.get(&metric).unwrap_or(&EMPTY);
            additive_value(rollup.value_of(metric), samples)
        } else {
            rollup.value_of(metric)
        };
        if let Some(value) = value {
            values.push(CanonicalValue {
                metric,
                value,
                unit: metric.unit(),
            });
        }
    }

    CanonicalDay {
        date_local,
        fallback_from: None,
        tz: tz.to_string(),
        values,
        source_updated_at: rollup.source_updated_at,
    }
}
