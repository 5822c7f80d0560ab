//! Threshold alert decision engine.
//!
//! Pure logic — no database access. The caller fetches the candidate
//! reading, the user's configured band and the stored suppression state
//! and passes them in; the decision updates nothing itself (state is
//! persisted only after a dispatch actually succeeds).

use chrono::Duration;

use crate::alert::{AlertKind, ThresholdAlert};
use crate::metric::Metric;
use crate::types::Timestamp;

/// Minimum change from the last-notified value before a repeat violation
/// re-fires inside the suppression window.
pub const RENOTIFY_DELTA: f64 = 5.0;

/// Suppression window: minimum elapsed time before a repeat violation
/// may re-notify regardless of delta.
pub const RENOTIFY_INTERVAL_SECS: i64 = 3600;

/// A user's configured band. An absent side disables that direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlertThresholds {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl AlertThresholds {
    /// True when neither side is configured — the user is skipped.
    pub fn is_disabled(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }
}

/// Per-user suppression state, mirroring the `notification_state` row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuppressionState {
    /// Last value that triggered a high-side notification.
    pub last_max_notified: Option<f64>,
    /// Last value that triggered a low-side notification.
    pub last_min_notified: Option<f64>,
    /// When the last notification of any kind was sent.
    pub last_notification_time: Timestamp,
}

/// Where the candidate reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingOrigin {
    /// A live intraday reading from the current-reading cache.
    Live,
    /// A stored daily aggregate, possibly from a prior day.
    DailyAggregate,
}

/// The most recent available reading, selected by the caller.
///
/// A live reading carries the same value on both sides; a daily
/// aggregate carries the day's max for the high check and the day's min
/// for the low check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateReading {
    pub metric: Metric,
    pub high_value: Option<f64>,
    pub low_value: Option<f64>,
    pub observed_at: Timestamp,
    pub origin: ReadingOrigin,
}

impl CandidateReading {
    /// A live reading: one value checked against both sides.
    pub fn live(metric: Metric, value: f64, observed_at: Timestamp) -> Self {
        Self {
            metric,
            high_value: Some(value),
            low_value: Some(value),
            observed_at,
            origin: ReadingOrigin::Live,
        }
    }

    /// A daily aggregate: day max vs. high, day min vs. low.
    pub fn daily(
        metric: Metric,
        max: Option<f64>,
        min: Option<f64>,
        observed_at: Timestamp,
    ) -> Self {
        Self {
            metric,
            high_value: max,
            low_value: min,
            observed_at,
            origin: ReadingOrigin::DailyAggregate,
        }
    }
}

/// Decide whether `reading` constitutes a new violation worth notifying.
///
/// A side fires only when all of: that side is configured, the value
/// crosses it, and suppression allows it — the value differs from the
/// last-notified value by at least [`RENOTIFY_DELTA`], or at least
/// [`RENOTIFY_INTERVAL_SECS`] elapsed since the last notification, or
/// there is no prior state at all (cold start always fires).
pub fn evaluate(
    reading: &CandidateReading,
    thresholds: &AlertThresholds,
    state: Option<&SuppressionState>,
    now: Timestamp,
) -> Vec<ThresholdAlert> {
    let mut alerts = Vec::new();

    if let (Some(threshold), Some(value)) = (thresholds.high, reading.high_value) {
        if value > threshold && allows(state, |s| s.last_max_notified, value, now) {
            alerts.push(ThresholdAlert {
                metric: reading.metric,
                kind: AlertKind::High,
                value,
                threshold,
                observed_at: reading.observed_at,
            });
        }
    }

    if let (Some(threshold), Some(value)) = (thresholds.low, reading.low_value) {
        if value < threshold && allows(state, |s| s.last_min_notified, value, now) {
            alerts.push(ThresholdAlert {
                metric: reading.metric,
                kind: AlertKind::Low,
                value,
                threshold,
                observed_at: reading.observed_at,
            });
        }
    }

    alerts
}

/// Suppression check for one side.
fn allows(
    state: Option<&SuppressionState>,
    last_notified: impl Fn(&SuppressionState) -> Option<f64>,
    value: f64,
    now: Timestamp,
) -> bool {
    let Some(state) = state else {
        return true; // cold start
    };
    let interval_elapsed = now.signed_duration_since(state.last_notification_time)
        >= Duration::seconds(RENOTIFY_INTERVAL_SECS);
    match last_notified(state) {
        Some(last) => (value - last).abs() >= RENOTIFY_DELTA || interval_elapsed,
        None => true, // this side has never notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
    }

    fn band(low: Option<f64>, high: Option<f64>) -> AlertThresholds {
        AlertThresholds { low, high }
    }

    fn recent_state(last_max: Option<f64>, last_min: Option<f64>) -> SuppressionState {
        SuppressionState {
            last_max_notified: last_max,
            last_min_notified: last_min,
            // 10 minutes ago — inside the suppression window.
            last_notification_time: now() - Duration::minutes(10),
        }
    }

    #[test]
    fn cold_start_always_fires() {
        let reading = CandidateReading::live(Metric::HeartRateAvg, 105.0, now());
        let alerts = evaluate(&reading, &band(None, Some(100.0)), None, now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::High);
        assert_eq!(alerts[0].threshold, 100.0);
    }

    #[test]
    fn unconfigured_side_never_fires() {
        let reading = CandidateReading::live(Metric::HeartRateAvg, 300.0, now());
        assert!(evaluate(&reading, &band(Some(40.0), None), None, now()).is_empty());
    }

    #[test]
    fn within_band_never_fires() {
        let reading = CandidateReading::live(Metric::HeartRateAvg, 80.0, now());
        assert!(evaluate(&reading, &band(Some(40.0), Some(100.0)), None, now()).is_empty());
    }

    #[test]
    fn small_delta_inside_window_is_suppressed() {
        // Notified at 105 ten minutes ago; 106 is within the 5-unit delta.
        let reading = CandidateReading::live(Metric::HeartRateAvg, 106.0, now());
        let state = recent_state(Some(105.0), None);
        assert!(evaluate(&reading, &band(None, Some(100.0)), Some(&state), now()).is_empty());
    }

    #[test]
    fn escalation_fires_inside_window() {
        // 112 differs from 105 by >= 5, so it re-fires promptly.
        let reading = CandidateReading::live(Metric::HeartRateAvg, 112.0, now());
        let state = recent_state(Some(105.0), None);
        let alerts = evaluate(&reading, &band(None, Some(100.0)), Some(&state), now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].value, 112.0);
    }

    #[test]
    fn elapsed_interval_fires_despite_small_delta() {
        let reading = CandidateReading::live(Metric::HeartRateAvg, 106.0, now());
        let state = SuppressionState {
            last_max_notified: Some(105.0),
            last_min_notified: None,
            last_notification_time: now() - Duration::seconds(RENOTIFY_INTERVAL_SECS),
        };
        let alerts = evaluate(&reading, &band(None, Some(100.0)), Some(&state), now());
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn side_with_no_prior_notification_fires() {
        // High has notified before, low never has.
        let reading = CandidateReading::live(Metric::HeartRateAvg, 35.0, now());
        let state = recent_state(Some(105.0), None);
        let alerts = evaluate(&reading, &band(Some(40.0), Some(100.0)), Some(&state), now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Low);
    }

    #[test]
    fn daily_aggregate_checks_max_against_high_and_min_against_low() {
        let reading =
            CandidateReading::daily(Metric::HeartRateAvg, Some(130.0), Some(35.0), now());
        let alerts = evaluate(&reading, &band(Some(40.0), Some(120.0)), None, now());
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertKind::High);
        assert_eq!(alerts[0].value, 130.0);
        assert_eq!(alerts[1].kind, AlertKind::Low);
        assert_eq!(alerts[1].value, 35.0);
    }

    #[test]
    fn boundary_value_does_not_fire() {
        // Strictly-greater semantics: exactly at threshold is not a violation.
        let reading = CandidateReading::live(Metric::HeartRateAvg, 100.0, now());
        assert!(evaluate(&reading, &band(None, Some(100.0)), None, now()).is_empty());
    }
}
