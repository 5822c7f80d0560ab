//! Provider metrics normalizer.
//!
//! [`sync_day`] merges a provider's daily roll-up with its intraday
//! series for one local day, walking backwards through a bounded
//! lookback when the requested day is empty. [`persist_day`] writes the
//! result through the idempotent store. The merge arithmetic itself
//! lives in [`healthsync_core::merge`]; this module owns the I/O around
//! it.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};

use healthsync_core::day_window::{self, DayWindow};
use healthsync_core::merge::{self, CanonicalDay};
use healthsync_core::types::{DbId, Timestamp};
use healthsync_core::{Metric, Sample};
use healthsync_db::models::metric::{ReplaceIntradaySeries, UpsertMetricDaily};
use healthsync_db::repositories::{CurrentReadingRepo, MetricDailyRepo, MetricIntradayRepo};
use healthsync_db::DbPool;
use healthsync_providers::{Credential, ProviderError, ReadingSource};

use crate::error::SyncError;

/// Default fallback lookback for general metrics.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 3;

/// Extended lookback for heart-rate-specific lookups.
pub const HEART_RATE_LOOKBACK_DAYS: u32 = 8;

/// Resolution tag stored with intraday series.
pub const INTRADAY_RESOLUTION: &str = "1min";

/// Knobs for one sync pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// How many prior days to try when the requested day is empty.
    pub lookback_days: u32,
    /// Disable the lookback entirely (explicit single-day queries).
    pub allow_fallback: bool,
    /// Attach the merged inputs to the result for troubleshooting.
    pub debug: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            allow_fallback: true,
            debug: false,
        }
    }
}

/// A fully normalized day, ready to persist.
#[derive(Debug)]
pub struct NormalizedDay {
    pub user_id: DbId,
    pub provider: String,
    pub canonical: CanonicalDay,
    pub intraday: HashMap<Metric, Vec<Sample>>,
    pub window: DayWindow,
    /// Present only when [`SyncOptions::debug`] was set.
    pub debug_payload: Option<serde_json::Value>,
}

impl NormalizedDay {
    /// True when either the canonical record or any intraday series
    /// carries data.
    pub fn has_data(&self) -> bool {
        !self.canonical.is_empty() || self.intraday.values().any(|s| !s.is_empty())
    }
}

/// Outcome of [`sync_day`].
#[derive(Debug)]
pub enum SyncOutcome {
    Data(NormalizedDay),
    /// The lookback was exhausted without finding anything. Never a
    /// synthesized zero.
    NoData { requested: NaiveDate },
}

/// Normalize one (user, provider, day), with fallback lookback.
///
/// Tries `date_local` first; while the result is empty and fallback is
/// allowed, walks back one day at a time up to `lookback_days`. A hit on
/// a prior day is tagged with the originally requested date.
pub async fn sync_day(
    source: &dyn ReadingSource,
    credential: &Credential,
    user_id: DbId,
    date_local: NaiveDate,
    default_tz: Option<&str>,
    opts: &SyncOptions,
    now: Timestamp,
) -> Result<SyncOutcome, SyncError> {
    let attempts = if opts.allow_fallback {
        opts.lookback_days + 1
    } else {
        1
    };

    for back in 0..attempts {
        let date = date_local - Duration::days(i64::from(back));
        let mut day = fetch_one_day(source, credential, user_id, date, default_tz, opts, now).await?;
        if day.has_data() {
            if back > 0 {
                day.canonical.fallback_from = Some(date_local);
                tracing::debug!(
                    user_id,
                    provider = source.name(),
                    requested = %date_local,
                    resolved = %date,
                    "Normalizer: fallback lookback hit"
                );
            }
            return Ok(SyncOutcome::Data(day));
        }
    }

    Ok(SyncOutcome::NoData {
        requested: date_local,
    })
}

/// Fetch and reconcile a single day, no fallback.
///
/// Order is fixed: roll-up first (its timezone bounds the window), then
/// intraday per metric, then the merge.
async fn fetch_one_day(
    source: &dyn ReadingSource,
    credential: &Credential,
    user_id: DbId,
    date: NaiveDate,
    default_tz: Option<&str>,
    opts: &SyncOptions,
    now: Timestamp,
) -> Result<NormalizedDay, SyncError> {
    let rollup = source.fetch_daily(credential, date).await?.unwrap_or_default();

    let tz_name = rollup.timezone.as_deref().or(default_tz);
    let window = day_window::resolve(date, tz_name, now);
    if window.tz_fallback {
        tracing::warn!(
            user_id,
            provider = source.name(),
            requested_tz = tz_name.unwrap_or("<none>"),
            "Normalizer: unknown timezone, using default zone"
        );
    }

    let mut intraday: HashMap<Metric, Vec<Sample>> = HashMap::new();
    for &metric in source.intraday_metrics() {
        match source
            .fetch_intraday(credential, metric, window.start_utc, window.end_utc)
            .await
        {
            Ok(samples) => {
                intraday.insert(metric, samples);
            }
            // A shape problem skips that series, never the whole sync.
            Err(ProviderError::Shape(msg)) => {
                tracing::warn!(
                    user_id,
                    provider = source.name(),
                    metric = %metric,
                    error = %msg,
                    "Normalizer: intraday series skipped"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    let canonical = merge::reconcile(date, window.tz.name(), &rollup, &intraday);

    let debug_payload = opts.debug.then(|| {
        serde_json::json!({
            "rollup": {
                "steps": rollup.steps,
                "distance_m": rollup.distance_m,
                "calories": rollup.calories,
                "sleep_minutes": rollup.sleep_minutes,
            },
            "intraday_counts": intraday
                .iter()
                .map(|(m, s)| (m.as_str(), s.len()))
                .collect::<HashMap<_, _>>(),
        })
    });

    Ok(NormalizedDay {
        user_id,
        provider: source.name().to_string(),
        canonical,
        intraday,
        window,
        debug_payload,
    })
}

/// Counts of rows written by [`persist_day`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PersistCounts {
    pub daily_values: usize,
    pub intraday_series: usize,
}

/// Write a normalized day through the idempotent store.
///
/// Additive counters go through the monotonic (set-if-greater) upsert;
/// everything else is a plain last-write-wins upsert. Intraday series
/// replace whole windows. The freshest heart-rate sample also refreshes
/// the live current-reading cache.
pub async fn persist_day(pool: &DbPool, day: &NormalizedDay) -> Result<PersistCounts, SyncError> {
    let mut counts = PersistCounts::default();

    for value in &day.canonical.values {
        let row = UpsertMetricDaily {
            user_id: day.user_id,
            provider: day.provider.clone(),
            metric: value.metric.as_str().to_string(),
            date_local: day.canonical.date_local,
            value: Some(value.value),
            unit: value.unit.to_string(),
            tz: Some(day.canonical.tz.clone()),
            source_updated_at: day.canonical.source_updated_at,
        };
        if value.metric.is_additive() {
            MetricDailyRepo::upsert_monotonic(pool, &row).await?;
        } else {
            MetricDailyRepo::upsert(pool, &row).await?;
        }
        counts.daily_values += 1;
    }

    for (&metric, samples) in &day.intraday {
        if samples.is_empty() {
            continue;
        }
        MetricIntradayRepo::replace(
            pool,
            &ReplaceIntradaySeries {
                user_id: day.user_id,
                provider: day.provider.clone(),
                metric: metric.as_str().to_string(),
                date_local: day.canonical.date_local,
                resolution: INTRADAY_RESOLUTION.to_string(),
                start_at_utc: day.window.start_utc,
                end_at_utc: day.window.end_utc,
                samples: samples.clone(),
            },
        )
        .await?;
        counts.intraday_series += 1;

        if metric == Metric::HeartRate {
            if let Some(latest) = samples.last() {
                CurrentReadingRepo::upsert(
                    pool,
                    day.user_id,
                    metric.as_str(),
                    latest.value,
                    latest.ts_utc,
                )
                .await?;
            }
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use healthsync_core::merge::DailyRollUp;
    use healthsync_providers::AccountInfo;
    use std::collections::HashMap as Map;
    use std::sync::Mutex;

    /// Scripted provider: per-date roll-ups and intraday series, plus a
    /// call log to assert fetch ordering and lookback behavior.
    struct ScriptedSource {
        rollups: Map<NaiveDate, DailyRollUp>,
        intraday: Map<NaiveDate, Vec<Sample>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                rollups: Map::new(),
                intraday: Map::new(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReadingSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn resolve_account(
            &self,
            _credential: &Credential,
        ) -> Result<AccountInfo, ProviderError> {
            Ok(AccountInfo::default())
        }

        async fn fetch_daily(
            &self,
            _credential: &Credential,
            date: NaiveDate,
        ) -> Result<Option<DailyRollUp>, ProviderError> {
            self.calls.lock().unwrap().push(format!("daily:{date}"));
            Ok(self.rollups.get(&date).cloned())
        }

        async fn fetch_intraday(
            &self,
            _credential: &Credential,
            _metric: Metric,
            start_utc: Timestamp,
            _end_utc: Timestamp,
        ) -> Result<Vec<Sample>, ProviderError> {
            let date = start_utc.date_naive();
            self.calls.lock().unwrap().push(format!("intraday:{date}"));
            Ok(self.intraday.get(&date).cloned().unwrap_or_default())
        }

        fn intraday_metrics(&self) -> &'static [Metric] {
            &[Metric::Steps]
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn sample(secs: i64, value: f64) -> Sample {
        Sample {
            ts_utc: Utc.timestamp_opt(secs, 0).unwrap(),
            value,
        }
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn credential() -> Credential {
        Credential::new("token")
    }

    #[tokio::test]
    async fn direct_hit_is_untagged() {
        let mut source = ScriptedSource::new();
        source.rollups.insert(
            date(3),
            DailyRollUp {
                steps: Some(4000.0),
                ..Default::default()
            },
        );
        let outcome = sync_day(
            &source,
            &credential(),
            1,
            date(3),
            Some("UTC"),
            &SyncOptions::default(),
            now(),
        )
        .await
        .unwrap();

        match outcome {
            SyncOutcome::Data(day) => {
                assert_eq!(day.canonical.fallback_from, None);
                assert_eq!(day.canonical.value_of(Metric::Steps), Some(4000.0));
            }
            SyncOutcome::NoData { .. } => panic!("expected data"),
        }
    }

    #[tokio::test]
    async fn fallback_finds_prior_day_and_tags_origin() {
        // Only date-2 has data; lookback 3 must find it and tag the
        // originally requested date.
        let mut source = ScriptedSource::new();
        source.rollups.insert(
            date(1),
            DailyRollUp {
                steps: Some(2500.0),
                ..Default::default()
            },
        );
        let outcome = sync_day(
            &source,
            &credential(),
            1,
            date(3),
            Some("UTC"),
            &SyncOptions::default(),
            now(),
        )
        .await
        .unwrap();

        match outcome {
            SyncOutcome::Data(day) => {
                assert_eq!(day.canonical.date_local, date(1));
                assert_eq!(day.canonical.fallback_from, Some(date(3)));
                assert_eq!(day.canonical.value_of(Metric::Steps), Some(2500.0));
            }
            SyncOutcome::NoData { .. } => panic!("expected fallback hit"),
        }
    }

    #[tokio::test]
    async fn exhausted_lookback_reports_no_data() {
        let source = ScriptedSource::new();
        let outcome = sync_day(
            &source,
            &credential(),
            1,
            date(9),
            Some("UTC"),
            &SyncOptions::default(),
            now(),
        )
        .await
        .unwrap();

        assert_matches::assert_matches!(
            outcome,
            SyncOutcome::NoData { requested } if requested == date(9)
        );
        // Requested day + 3 lookback days were each tried.
        let calls = source.calls.lock().unwrap();
        let daily_calls = calls.iter().filter(|c| c.starts_with("daily:")).count();
        assert_eq!(daily_calls, 4);
    }

    #[tokio::test]
    async fn fallback_disabled_tries_only_the_requested_day() {
        let source = ScriptedSource::new();
        let opts = SyncOptions {
            allow_fallback: false,
            ..Default::default()
        };
        let outcome = sync_day(&source, &credential(), 1, date(9), Some("UTC"), &opts, now())
            .await
            .unwrap();

        assert_matches::assert_matches!(outcome, SyncOutcome::NoData { .. });
        assert_eq!(source.calls.lock().unwrap().len(), 2); // one daily + one intraday
    }

    #[tokio::test]
    async fn rollup_fetch_precedes_intraday_fetch() {
        let mut source = ScriptedSource::new();
        source.rollups.insert(date(3), DailyRollUp::default());
        source
            .intraday
            .insert(date(3), vec![sample(1717400000, 120.0)]);
        let _ = sync_day(
            &source,
            &credential(),
            1,
            date(3),
            Some("UTC"),
            &SyncOptions {
                allow_fallback: false,
                ..Default::default()
            },
            now(),
        )
        .await
        .unwrap();

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls[0], "daily:2024-06-03");
        assert_eq!(calls[1], "intraday:2024-06-03");
    }

    #[tokio::test]
    async fn intraday_only_day_counts_as_data() {
        // No roll-up at all, but intraday steps exist: the day is data,
        // and the additive merge picks up the sum.
        let mut source = ScriptedSource::new();
        source.intraday.insert(
            date(3),
            vec![sample(1717380000, 1200.0), sample(1717383600, 800.0)],
        );
        let outcome = sync_day(
            &source,
            &credential(),
            1,
            date(3),
            Some("UTC"),
            &SyncOptions::default(),
            now(),
        )
        .await
        .unwrap();

        match outcome {
            SyncOutcome::Data(day) => {
                assert_eq!(day.canonical.value_of(Metric::Steps), Some(2000.0));
            }
            SyncOutcome::NoData { .. } => panic!("expected data"),
        }
    }

    #[tokio::test]
    async fn idempotent_normalization() {
        // Same scripted responses twice produce identical canonical
        // records.
        let mut source = ScriptedSource::new();
        source.rollups.insert(
            date(3),
            DailyRollUp {
                steps: Some(4100.0),
                sleep_minutes: Some(420.0),
                ..Default::default()
            },
        );
        source
            .intraday
            .insert(date(3), vec![sample(1717380000, 2500.0), sample(1717383600, 2500.0)]);

        let run = || async {
            match sync_day(
                &source,
                &credential(),
                1,
                date(3),
                Some("UTC"),
                &SyncOptions::default(),
                now(),
            )
            .await
            .unwrap()
            {
                SyncOutcome::Data(day) => day.canonical,
                SyncOutcome::NoData { .. } => panic!("expected data"),
            }
        };

        let first = run().await;
        let second = run().await;
        assert_eq!(first, second);
        assert_eq!(first.value_of(Metric::Steps), Some(5000.0));
    }

    #[tokio::test]
    async fn debug_payload_only_when_requested() {
        let mut source = ScriptedSource::new();
        source.rollups.insert(
            date(3),
            DailyRollUp {
                steps: Some(100.0),
                ..Default::default()
            },
        );

        let plain = match sync_day(
            &source,
            &credential(),
            1,
            date(3),
            Some("UTC"),
            &SyncOptions::default(),
            now(),
        )
        .await
        .unwrap()
        {
            SyncOutcome::Data(day) => day,
            _ => panic!(),
        };
        assert!(plain.debug_payload.is_none());

        let debug = match sync_day(
            &source,
            &credential(),
            1,
            date(3),
            Some("UTC"),
            &SyncOptions {
                debug: true,
                ..Default::default()
            },
            now(),
        )
        .await
        .unwrap()
        {
            SyncOutcome::Data(day) => day,
            _ => panic!(),
        };
        assert!(debug.debug_payload.is_some());
    }
}
