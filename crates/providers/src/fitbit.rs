//! Fitbit reading source.
//!
//! Wraps the Fitbit Web API. The daily roll-up is assembled from the
//! activity summary plus best-effort enrichment calls (heart, sleep,
//! weight, SpO2) — an enrichment failure degrades the roll-up instead of
//! failing the sync. Intraday series arrive as clock-time datasets
//! relative to the requested local day and are rebased onto the UTC day
//! window before leaving this module.

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;

use healthsync_core::merge::DailyRollUp;
use healthsync_core::sample::sort_dedup;
use healthsync_core::types::Timestamp;
use healthsync_core::{Metric, Sample};

use crate::error::ProviderError;
use crate::source::{AccountInfo, Credential, ReadingSource};

/// Public Fitbit API host.
const FITBIT_API: &str = "https://api.fitbit.com";

/// Every provider request times out after this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fitbit Web API client.
pub struct FitbitSource {
    client: reqwest::Client,
    base_url: String,
}

impl Default for FitbitSource {
    fn default() -> Self {
        Self::with_base_url(FITBIT_API)
    }
}

impl FitbitSource {
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

    /// GET a JSON document, mapping non-success statuses to the error
    /// taxonomy.
    async fn get_json(&self, credential: &Credential, path: &str) -> Result<Value, ProviderError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&credential.access_token)
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

        Ok(response.json().await?)
    }

    /// Best-effort GET for roll-up enrichment: a failure is logged and
    /// read as "nothing", so one broken endpoint never fails the day.
    async fn get_json_opt(&self, credential: &Credential, path: &str) -> Option<Value> {
        match self.get_json(credential, path).await {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::debug!(path, error = %e, "Fitbit enrichment request failed");
                None
            }
        }
    }
}

/// Fitbit intraday resource path segment for a metric.
fn intraday_resource(metric: Metric) -> Option<&'static str> {
    match metric {
        Metric::Steps => Some("steps"),
        Metric::HeartRate => Some("heart"),
        _ => None,
    }
}

#[async_trait::async_trait]
impl ReadingSource for FitbitSource {
    fn name(&self) -> &'static str {
        crate::PROVIDER_FITBIT
    }

    async fn resolve_account(&self, credential: &Credential) -> Result<AccountInfo, ProviderError> {
        let json = self.get_json(credential, "/1/user/-/profile.json").await?;
        let user = &json["user"];
        Ok(AccountInfo {
            provider_user_id: user["encodedId"].as_str().map(str::to_string),
            timezone_hint: user["timezone"].as_str().map(str::to_string),
        })
    }

    async fn fetch_daily(
        &self,
        credential: &Credential,
        date: NaiveDate,
    ) -> Result<Option<DailyRollUp>, ProviderError> {
        let daily = self
            .get_json(credential, &format!("/1/user/-/activities/date/{date}.json"))
            .await?;
        let Some(summary) = daily.get("summary") else {
            return Ok(None);
        };

        let mut rollup = DailyRollUp {
            steps: summary["steps"].as_f64(),
            distance_m: total_distance_km(summary).map(|km| km * 1000.0),
            calories: summary["caloriesOut"].as_f64(),
            ..Default::default()
        };

        if let Some(heart) = self
            .get_json_opt(credential, &format!("/1/user/-/activities/heart/date/{date}/1d.json"))
            .await
        {
            rollup.resting_hr = heart["activities-heart"][0]["value"]["restingHeartRate"].as_f64();
        }

        if let Some(sleep) = self
            .get_json_opt(credential, &format!("/1.2/user/-/sleep/date/{date}.json"))
            .await
        {
            rollup.sleep_minutes = sleep_minutes(&sleep);
        }

        if let Some(weight) = self
            .get_json_opt(credential, &format!("/1/user/-/body/log/weight/date/{date}.json"))
            .await
        {
            rollup.weight_kg = weight["weight"][0]["weight"].as_f64();
        }

        if let Some(spo2) = self
            .get_json_opt(credential, &format!("/1/user/-/spo2/date/{date}.json"))
            .await
        {
            // Fitbit returns "--" placeholders before the nightly summary
            // exists; a non-object value reads as absent.
            rollup.spo2_pct = spo2["spo2"][0]["value"]["avg"].as_f64();
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
        let Some(resource) = intraday_resource(metric) else {
            return Ok(Vec::new());
        };
        let date = start_utc.date_naive();
        let json = self
            .get_json(
                credential,
                &format!("/1/user/-/activities/{resource}/date/{date}/1d/1min.json"),
            )
            .await?;

        let dataset = json[format!("activities-{resource}-intraday")]["dataset"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        // Dataset entries carry clock times relative to the local day.
        // The window start *is* local midnight as a UTC instant, so each
        // entry lands at start + seconds-since-midnight.
        let mut skipped = 0usize;
        let mut samples = Vec::with_capacity(dataset.len());
        for entry in &dataset {
            match clock_sample(entry, start_utc) {
                Some(sample) if sample.ts_utc < end_utc => samples.push(sample),
                Some(_) => {}
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::debug!(metric = %metric, skipped, "Fitbit intraday: dropped unparseable entries");
        }

        Ok(sort_dedup(samples))
    }

    fn intraday_metrics(&self) -> &'static [Metric] {
        &[Metric::Steps, Metric::HeartRate]
    }
}

/// The "total" entry of the activity summary distances list, in km.
fn total_distance_km(summary: &Value) -> Option<f64> {
    summary["distances"].as_array()?.iter().find_map(|d| {
        if d["activity"].as_str() == Some("total") {
            d["distance"].as_f64()
        } else {
            None
        }
    })
}

/// Minutes asleep, preferring main-sleep logs over the combined total
/// (naps inflate the combined number).
fn sleep_minutes(sleep: &Value) -> Option<f64> {
    let logs = sleep["sleep"].as_array();
    let main: f64 = logs
        .map(|logs| {
            logs.iter()
                .filter(|log| log["isMainSleep"].as_bool() == Some(true))
                .filter_map(|log| log["minutesAsleep"].as_f64())
                .sum()
        })
        .unwrap_or(0.0);
    if main > 0.0 {
        return Some(main);
    }
    sleep["summary"]["totalMinutesAsleep"].as_f64()
}

/// One dataset entry (`{"time": "08:01:00", "value": 70}`) rebased onto
/// the UTC day window.
fn clock_sample(entry: &Value, day_start_utc: Timestamp) -> Option<Sample> {
    let time = entry["time"].as_str()?;
    let value = entry["value"].as_f64()?;
    let clock = chrono::NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    let since_midnight = clock.signed_duration_since(chrono::NaiveTime::MIN);
    Some(Sample {
        ts_utc: day_start_utc + since_midnight,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn total_distance_picks_the_total_entry() {
        let summary = json!({
            "distances": [
                {"activity": "veryActive", "distance": 1.2},
                {"activity": "total", "distance": 4.5}
            ]
        });
        assert_eq!(total_distance_km(&summary), Some(4.5));
    }

    #[test]
    fn sleep_prefers_main_sleep() {
        let sleep = json!({
            "summary": {"totalMinutesAsleep": 500},
            "sleep": [
                {"isMainSleep": true, "minutesAsleep": 420},
                {"isMainSleep": false, "minutesAsleep": 80}
            ]
        });
        assert_eq!(sleep_minutes(&sleep), Some(420.0));
    }

    #[test]
    fn sleep_falls_back_to_summary_total() {
        let sleep = json!({
            "summary": {"totalMinutesAsleep": 500},
            "sleep": []
        });
        assert_eq!(sleep_minutes(&sleep), Some(500.0));
    }

    #[test]
    fn clock_entries_rebase_onto_the_day_window() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 4, 0, 0).unwrap();
        let entry = json!({"time": "08:01:00", "value": 70});
        let sample = clock_sample(&entry, start).unwrap();
        assert_eq!(sample.ts_utc, Utc.with_ymd_and_hms(2024, 6, 3, 12, 1, 0).unwrap());
        assert_eq!(sample.value, 70.0);
    }

    #[test]
    fn garbled_clock_entry_is_none() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        assert!(clock_sample(&json!({"time": "soon", "value": 70}), start).is_none());
        assert!(clock_sample(&json!({"value": 70}), start).is_none());
    }
}
