//! Threshold alert engine orchestration.
//!
//! Per user and per tick: select the freshest available reading (live
//! cache first, stored daily aggregates as fallback), run the decision
//! in [`healthsync_core::thresholds`], dispatch through the
//! [`Notifier`], and persist suppression state only for alerts that
//! actually went out. A dispatch failure is logged and leaves the state
//! untouched so the alert stays retry-worthy.

use chrono::Duration;

use healthsync_core::thresholds::{self, CandidateReading};
use healthsync_core::types::{DbId, Timestamp};
use healthsync_core::{Metric, ThresholdAlert};
use healthsync_db::models::user::User;
use healthsync_db::repositories::{CurrentReadingRepo, MetricDailyRepo, NotificationStateRepo};
use healthsync_db::DbPool;
use healthsync_events::Notifier;

use crate::error::SyncError;
use crate::normalizer::HEART_RATE_LOOKBACK_DAYS;

/// How recent a cached live reading must be to outrank stored daily
/// aggregates.
pub const LIVE_FRESHNESS_SECS: i64 = 900;

/// Outcome of one user's alert evaluation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AlertOutcome {
    /// A candidate reading existed and the decision ran.
    pub evaluated: bool,
    /// Alerts dispatched and recorded.
    pub fired: usize,
    /// Alerts whose dispatch failed; state untouched, will retry.
    pub dispatch_failures: usize,
}

/// Run the alert engine for one user.
pub async fn evaluate_user(
    pool: &DbPool,
    notifier: &dyn Notifier,
    user: &User,
    now: Timestamp,
) -> Result<AlertOutcome, SyncError> {
    let thresholds = user.thresholds();
    if thresholds.is_disabled() {
        return Ok(AlertOutcome::default());
    }
    let Some(email) = user.email.as_deref() else {
        // Nothing to deliver to; evaluating would only burn suppression
        // state.
        return Ok(AlertOutcome::default());
    };

    let Some(candidate) = select_candidate(pool, user.id, now).await? else {
        return Ok(AlertOutcome::default());
    };

    // Lazy state creation: the fresh row has no last-notified values, so
    // the very first violation always fires.
    let state = NotificationStateRepo::get_or_create(pool, user.id, now).await?;
    let alerts = thresholds::evaluate(&candidate, &thresholds, Some(&state.suppression()), now);

    let user_name = user.display_name.as_deref().unwrap_or("User");
    let (sent, dispatch_failures) = dispatch_alerts(notifier, email, user_name, alerts).await;

    // Suppression state advances only for alerts that actually went out;
    // a failed dispatch stays retry-worthy.
    for alert in &sent {
        NotificationStateRepo::record_notified(pool, user.id, alert.kind, alert.value, now).await?;
        tracing::info!(
            user_id = user.id,
            kind = alert.kind.as_str(),
            value = alert.value,
            threshold = alert.threshold,
            "Threshold alert dispatched"
        );
    }

    Ok(AlertOutcome {
        evaluated: true,
        fired: sent.len(),
        dispatch_failures,
    })
}

/// Pick the most recent available heart-rate reading.
///
/// A live cached reading within [`LIVE_FRESHNESS_SECS`] wins outright;
/// otherwise the freshest stored daily aggregate within the heart-rate
/// lookback serves, with the day's max checked against the high side
/// and the day's min against the low side.
pub async fn select_candidate(
    pool: &DbPool,
    user_id: DbId,
    now: Timestamp,
) -> Result<Option<CandidateReading>, SyncError> {
    if let Some(live) = CurrentReadingRepo::get(pool, user_id, Metric::HeartRate.as_str()).await? {
        if now.signed_duration_since(live.measured_at_utc)
            <= Duration::seconds(LIVE_FRESHNESS_SECS)
        {
            return Ok(Some(CandidateReading::live(
                Metric::HeartRate,
                live.value,
                live.measured_at_utc,
            )));
        }
    }

    let today = now.date_naive();
    let lookback = i64::from(HEART_RATE_LOOKBACK_DAYS);
    let max_row = MetricDailyRepo::latest_value(
        pool,
        user_id,
        Metric::HeartRateMax.as_str(),
        today,
        lookback,
    )
    .await?;
    let min_row = MetricDailyRepo::latest_value(
        pool,
        user_id,
        Metric::HeartRateMin.as_str(),
        today,
        lookback,
    )
    .await?;

    if max_row.is_none() && min_row.is_none() {
        return Ok(None);
    }

    let observed_at = max_row
        .as_ref()
        .or(min_row.as_ref())
        .and_then(|row| row.source_updated_at)
        .unwrap_or_else(|| {
            max_row
                .as_ref()
                .or(min_row.as_ref())
                .map(|row| row.updated_at)
                .unwrap_or(now)
        });

    Ok(Some(CandidateReading::daily(
        Metric::HeartRate,
        max_row.and_then(|r| r.value),
        min_row.and_then(|r| r.value),
        observed_at,
    )))
}

/// Dispatch a batch of alerts, splitting them into sent and failed.
///
/// Separated from [`evaluate_user`] so the dispatch/state contract is
/// testable without a database: only the returned `sent` alerts may be
/// recorded into suppression state.
pub async fn dispatch_alerts(
    notifier: &dyn Notifier,
    recipient: &str,
    user_name: &str,
    alerts: Vec<ThresholdAlert>,
) -> (Vec<ThresholdAlert>, usize) {
    let mut sent = Vec::new();
    let mut failed = 0usize;
    for alert in alerts {
        match notifier.send_threshold_alert(recipient, user_name, &alert).await {
            Ok(()) => sent.push(alert),
            Err(e) => {
                failed += 1;
                tracing::error!(recipient, error = %e, "Threshold alert dispatch failed");
            }
        }
    }
    (sent, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use healthsync_core::sample::sort_dedup;
    use healthsync_core::thresholds::{AlertThresholds, SuppressionState};
    use healthsync_core::{AlertKind, Sample};
    use healthsync_events::NotifyError;
    use std::sync::Mutex;

    /// Notifier double: records deliveries, optionally failing them all.
    struct MockNotifier {
        fail: bool,
        delivered: Mutex<Vec<(String, ThresholdAlert)>>,
    }

    impl MockNotifier {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                delivered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn send_threshold_alert(
            &self,
            recipient: &str,
            _user_name: &str,
            alert: &ThresholdAlert,
        ) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Transport("smtp down".to_string()));
            }
            self.delivered
                .lock()
                .unwrap()
                .push((recipient.to_string(), alert.clone()));
            Ok(())
        }
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap()
    }

    fn sample(secs_ago: i64, value: f64) -> Sample {
        Sample {
            ts_utc: now() - Duration::seconds(secs_ago),
            value,
        }
    }

    /// End-to-end decision semantics: intraday samples [90, 125, 130]
    /// against high=120 select the most recent value, fire exactly one
    /// high alert carrying the threshold, and only the sent alert is
    /// eligible for state recording.
    #[tokio::test]
    async fn end_to_end_latest_sample_fires_once() {
        let samples = sort_dedup(vec![
            sample(600, 90.0),
            sample(300, 125.0),
            sample(60, 130.0),
        ]);
        let latest = *samples.last().unwrap();
        let candidate = CandidateReading::live(Metric::HeartRate, latest.value, latest.ts_utc);

        let thresholds = AlertThresholds {
            low: None,
            high: Some(120.0),
        };
        // Cold start: fresh state row with nothing notified yet.
        let state = SuppressionState {
            last_max_notified: None,
            last_min_notified: None,
            last_notification_time: now(),
        };

        let alerts = thresholds::evaluate(&candidate, &thresholds, Some(&state), now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::High);
        assert_eq!(alerts[0].value, 130.0);
        assert_eq!(alerts[0].threshold, 120.0);

        let notifier = MockNotifier::new(false);
        let (sent, failed) = dispatch_alerts(&notifier, "ada@example.com", "Ada", alerts).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(failed, 0);
        // The value to record as last_max_notified is the sent alert's.
        assert_eq!(sent[0].value, 130.0);
        assert_eq!(notifier.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_failure_keeps_alert_out_of_sent() {
        let candidate = CandidateReading::live(Metric::HeartRate, 130.0, now());
        let alerts = thresholds::evaluate(
            &candidate,
            &AlertThresholds {
                low: None,
                high: Some(120.0),
            },
            None,
            now(),
        );
        assert_eq!(alerts.len(), 1);

        let notifier = MockNotifier::new(true);
        let (sent, failed) = dispatch_alerts(&notifier, "ada@example.com", "Ada", alerts).await;
        // Nothing sent: suppression state must not be advanced, so the
        // alert can retry next cycle.
        assert!(sent.is_empty());
        assert_eq!(failed, 1);
    }
}
