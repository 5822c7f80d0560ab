//! Withings reading source.
//!
//! Wraps the Withings Measure APIs. Withings answers HTTP 200 with a
//! body-level `status` field; a non-zero status means "nothing for you"
//! and reads as an empty result, not an error. Measure values are
//! mantissa/exponent pairs (`value * 10^unit`) decoded here. Intraday
//! series come back in several shapes and go through the payload union
//! in [`crate::intraday`].

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use healthsync_core::merge::DailyRollUp;
use healthsync_core::types::Timestamp;
use healthsync_core::{Metric, Sample};

use crate::error::ProviderError;
use crate::intraday::{flatten, IntradayPayload};
use crate::source::{AccountInfo, Credential, ReadingSource};

/// Public Withings API host.
const WITHINGS_API: &str = "https://wbsapi.withings.net";

/// Every provider request times out after this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Withings measure type codes (getmeas).
const MEASTYPE_WEIGHT: i64 = 1;
const MEASTYPE_HEART_RATE: i64 = 11;
const MEASTYPE_BODY_TEMP: i64 = 12;
const MEASTYPE_SPO2: i64 = 54;
const MEASTYPE_SKIN_TEMP: i64 = 73;

/// Withings Measure API client.
pub struct WithingsSource {
    client: reqwest::Client,
    base_url: String,
}

impl Default for WithingsSource {
    fn default() -> Self {
        Self::with_base_url(WITHINGS_API)
    }
}

impl WithingsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client against a non-default host (test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client builds");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// POST a form-encoded action, mapping HTTP errors to the taxonomy
    /// and a non-zero body status to `Ok(None)` (empty, UI stays
    /// resilient).
    async fn post_action(
        &self,
        credential: &Credential,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<Option<Value>, ProviderError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&credential.access_token)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::from_status(status, retry_after));
        }

        let json: Value = response.json().await?;
        match json["status"].as_i64() {
            Some(0) => Ok(Some(json)),
            Some(401) => Err(ProviderError::Unauthorized),
            _ => Ok(None),
        }
    }
}

/// Withings intraday `data_fields` name for a metric.
fn intraday_field(metric: Metric) -> Option<&'static str> {
    match metric {
        Metric::HeartRate => Some("heart_rate"),
        Metric::Steps => Some("steps"),
        _ => None,
    }
}

#[async_trait::async_trait]
impl ReadingSource for WithingsSource {
    fn name(&self) -> &'static str {
        crate::PROVIDER_WITHINGS
    }

    async fn resolve_account(&self, _credential: &Credential) -> Result<AccountInfo, ProviderError> {
        // Withings exposes no timezone on the measure APIs; the activity
        // roll-up carries one per day instead.
        Ok(AccountInfo::default())
    }

    async fn fetch_daily(
        &self,
        credential: &Credential,
        date: NaiveDate,
    ) -> Result<Option<DailyRollUp>, ProviderError> {
        let ymd = date.to_string();
        let activity = self
            .post_action(
                credential,
                "/v2/measure",
                &[
                    ("action", "getactivity".to_string()),
                    ("startdateymd", ymd.clone()),
                    ("enddateymd", ymd.clone()),
                    (
                        "data_fields",
                        "steps,distance,calories,hr_average,hr_min,hr_max,timezone".to_string(),
                    ),
                ],
            )
            .await?;

        let mut rollup = DailyRollUp::default();
        let mut saw_activity = false;

        if let Some(activity) = &activity {
            if let Some(a0) = activity["body"]["activities"].as_array().and_then(|a| a.first()) {
                saw_activity = true;
                rollup.steps = a0["steps"].as_f64();
                rollup.distance_m = a0["distance"].as_f64().map(normalize_distance_m);
                rollup.calories = a0["calories"].as_f64();
                rollup.hr_avg = a0["hr_average"].as_f64();
                rollup.hr_min = a0["hr_min"].as_f64();
                rollup.hr_max = a0["hr_max"].as_f64();
                rollup.timezone = a0["timezone"].as_str().map(str::to_string);
                rollup.source_updated_at = a0["modified"]
                    .as_i64()
                    .or_else(|| a0["date"].as_i64())
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
            }
        }

        if let Some(sleep) = self
            .post_action(
                credential,
                "/v2/sleep",
                &[
                    ("action", "getsummary".to_string()),
                    ("startdateymd", ymd.clone()),
                    ("enddateymd", ymd.clone()),
                    ("data_fields", "totalsleepduration,asleepduration".to_string()),
                ],
            )
            .await?
        {
            rollup.sleep_minutes = sleep_minutes(&sleep);
        }

        if let Some(meas) = self
            .post_action(
                credential,
                "/measure",
                &[
                    ("action", "getmeas".to_string()),
                    ("category", "1".to_string()),
                    ("startdateymd", ymd.clone()),
                    ("enddateymd", ymd),
                    (
                        "meastype",
                        format!("{MEASTYPE_WEIGHT},{MEASTYPE_HEART_RATE},{MEASTYPE_SPO2},{MEASTYPE_BODY_TEMP},{MEASTYPE_SKIN_TEMP}"),
                    ),
                ],
            )
            .await?
        {
            rollup.weight_kg = latest_measure(&meas, &[MEASTYPE_WEIGHT]);
            rollup.resting_hr = latest_measure(&meas, &[MEASTYPE_HEART_RATE]);
            rollup.spo2_pct = latest_measure(&meas, &[MEASTYPE_SPO2]);
            rollup.body_temp_c = latest_measure(&meas, &[MEASTYPE_BODY_TEMP]);
            rollup.skin_temp_c = latest_measure(&meas, &[MEASTYPE_SKIN_TEMP]);
        }

        if !saw_activity
            && rollup.sleep_minutes.is_none()
            && rollup.weight_kg.is_none()
            && rollup.resting_hr.is_none()
            && rollup.spo2_pct.is_none()
            && rollup.body_temp_c.is_none()
            && rollup.skin_temp_c.is_none()
        {
            return Ok(None);
        }
        Ok(Some(rollup))
    }

    async fn fetch_intraday(
        &self,
        credential: &Credential,
        metric: Metric,
        start_utc: Timestamp,
        end_utc: Timestamp,
    ) -> Result<Vec<Sample>, ProviderError> {
        let Some(field) = intraday_field(metric) else {
            return Ok(Vec::new());
        };
        let Some(json) = self
            .post_action(
                credential,
                "/v2/measure",
                &[
                    ("action", "getintradayactivity".to_string()),
                    ("startdate", start_utc.timestamp().to_string()),
                    ("enddate", end_utc.timestamp().to_string()),
                    ("data_fields", field.to_string()),
                ],
            )
            .await?
        else {
            return Ok(Vec::new());
        };

        // The series slot varies: a list of points, a map keyed by epoch,
        // or a map keyed by field name. Try `body.series`, then
        // `body.data`.
        let body = &json["body"];
        let raw = if body["series"].is_null() { &body["data"] } else { &body["series"] };
        let payload: IntradayPayload = match serde_json::from_value(raw.clone()) {
            Ok(p) => p,
            Err(e) => {
                return Err(ProviderError::Shape(format!(
                    "intraday series did not match any known shape: {e}"
                )))
            }
        };

        let flat = flatten(payload, field);
        if flat.skipped > 0 {
            tracing::debug!(metric = %metric, skipped = flat.skipped, "Withings intraday: dropped unparseable entries");
        }
        Ok(flat.samples)
    }

    fn intraday_metrics(&self) -> &'static [Metric] {
        &[Metric::HeartRate]
    }
}

/// Withings activity distance is usually meters but some devices report
/// km; values that look like km are scaled up.
fn normalize_distance_m(raw: f64) -> f64 {
    if raw > 1000.0 {
        raw
    } else {
        raw * 1000.0
    }
}

/// Sum of sleep durations (seconds) over the day's series, in minutes.
/// Prefers `totalsleepduration`, falling back to `asleepduration`.
fn sleep_minutes(sleep: &Value) -> Option<f64> {
    let series = sleep["body"]["series"].as_array()?;
    let total_secs: f64 = series
        .iter()
        .filter_map(|item| {
            let data = &item["data"];
            data["totalsleepduration"]
                .as_f64()
                .or_else(|| data["asleepduration"].as_f64())
        })
        .sum();
    if total_secs > 0.0 {
        Some(total_secs / 60.0)
    } else {
        None
    }
}

/// Decode the most recent real measurement of any of `types` from a
/// getmeas response: `value * 10^unit`, latest group by epoch date.
fn latest_measure(meas: &Value, types: &[i64]) -> Option<f64> {
    let groups = meas["body"]["measuregrps"].as_array()?;
    let mut latest: Option<(i64, f64)> = None;
    for group in groups {
        let ts = group["date"].as_i64().unwrap_or(-1);
        for measure in group["measures"].as_array().into_iter().flatten() {
            let mtype = measure["type"].as_i64().unwrap_or(-1);
            if !types.contains(&mtype) {
                continue;
            }
            let (Some(value), Some(unit)) = (measure["value"].as_f64(), measure["unit"].as_i64())
            else {
                continue;
            };
            let decoded = value * 10f64.powi(unit as i32);
            if latest.map(|(t, _)| ts > t).unwrap_or(true) {
                latest = Some((ts, decoded));
            }
        }
    }
    latest.map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn distance_heuristic_normalizes_km() {
        assert_eq!(normalize_distance_m(3.2), 3200.0);
        assert_eq!(normalize_distance_m(4200.0), 4200.0);
    }

    #[test]
    fn sleep_sums_series_and_prefers_total_duration() {
        let sleep = json!({
            "body": {"series": [
                {"data": {"totalsleepduration": 21600, "asleepduration": 20000}},
                {"data": {"asleepduration": 3600}}
            ]}
        });
        // 21600 + 3600 seconds = 420 minutes
        assert_eq!(sleep_minutes(&sleep), Some(420.0));
    }

    #[test]
    fn empty_sleep_series_is_absent_not_zero() {
        let sleep = json!({"body": {"series": []}});
        assert_eq!(sleep_minutes(&sleep), None);
    }

    #[test]
    fn measure_decoding_applies_mantissa_exponent() {
        let meas = json!({
            "body": {"measuregrps": [
                {"date": 1717400000, "measures": [{"type": 1, "value": 72500, "unit": -3}]}
            ]}
        });
        assert_eq!(latest_measure(&meas, &[MEASTYPE_WEIGHT]), Some(72.5));
    }

    #[test]
    fn measure_picks_latest_group() {
        let meas = json!({
            "body": {"measuregrps": [
                {"date": 100, "measures": [{"type": 1, "value": 70, "unit": 0}]},
                {"date": 200, "measures": [{"type": 1, "value": 71, "unit": 0}]}
            ]}
        });
        assert_eq!(latest_measure(&meas, &[MEASTYPE_WEIGHT]), Some(71.0));
    }

    #[test]
    fn measure_ignores_other_types() {
        let meas = json!({
            "body": {"measuregrps": [
                {"date": 100, "measures": [{"type": 11, "value": 60, "unit": 0}]}
            ]}
        });
        assert_eq!(latest_measure(&meas, &[MEASTYPE_WEIGHT]), None);
        assert_eq!(latest_measure(&meas, &[MEASTYPE_HEART_RATE]), Some(60.0));
    }
}
