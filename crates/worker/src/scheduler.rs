//! Periodic sync scheduler.
//!
//! Invokes the pipeline for every syncable user on a fixed interval.
//! Not a precision scheduler: the batch runs sequentially on one task,
//! and `MissedTickBehavior::Delay` pushes the next tick out rather than
//! overlapping batches — no two batches ever run concurrently, which is
//! what keeps duplicate alert evaluations out.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use healthsync_core::correlation::CorrelationStore;
use healthsync_db::repositories::UserRepo;
use healthsync_db::DbPool;
use healthsync_events::Notifier;
use healthsync_pipeline::normalizer::SyncOptions;
use healthsync_pipeline::{sync_user, SourceRegistry, SyncError};

/// Default tick interval.
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Backoff applied to a rate-limited user when the provider did not
/// suggest a wait.
const DEFAULT_BACKOFF_SECS: i64 = 900;

/// Background service that runs the sync-and-alert pipeline for the
/// full user set on a periodic basis.
pub struct SyncScheduler {
    pool: DbPool,
    sources: SourceRegistry,
    notifier: Box<dyn Notifier>,
    interval: Duration,
    /// Rate-limit backoff deadlines keyed by user id; entries expire on
    /// their own, so a restart simply clears the backoff.
    backoff: CorrelationStore<()>,
}

impl SyncScheduler {
    /// Create a scheduler. The interval comes from `SYNC_INTERVAL_SECS`
    /// (default 300).
    pub fn new(pool: DbPool, sources: SourceRegistry, notifier: Box<dyn Notifier>) -> Self {
        let interval_secs = std::env::var("SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS);
        Self {
            pool,
            sources,
            notifier,
            interval: Duration::from_secs(interval_secs),
            backoff: CorrelationStore::new(),
        }
    }

    /// Run the scheduler loop until `cancel` is triggered.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Sync scheduler started"
        );

        let mut interval = tokio::time::interval(self.interval);
        // A batch that overruns the interval delays the next tick
        // instead of stacking a second batch behind it.
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Sync scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.run_batch().await;
                }
            }
        }
    }

    /// One pass over the full user set. Per-user failures are contained
    /// here and aggregated into the batch summary.
    async fn run_batch(&mut self) {
        let now = Utc::now();
        self.backoff.sweep(now);

        let users = match UserRepo::list_syncable(&self.pool).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!(error = %e, "Batch skipped: could not list users");
                return;
            }
        };

        let mut ok = 0usize;
        let mut failed = 0usize;
        let mut rate_limited = 0usize;
        let mut alerts_fired = 0usize;

        for user in &users {
            let key = user.id.to_string();
            if self.backoff.get(&key, now).is_some() {
                rate_limited += 1;
                continue;
            }

            match sync_user(
                &self.pool,
                &self.sources,
                self.notifier.as_ref(),
                user,
                &SyncOptions::default(),
                now,
            )
            .await
            {
                Ok(report) => {
                    ok += 1;
                    alerts_fired += report.alerts_fired;
                    if report.providers_failed > 0 || report.alert_dispatch_failures > 0 {
                        tracing::warn!(
                            user_id = user.id,
                            providers_failed = report.providers_failed,
                            dispatch_failures = report.alert_dispatch_failures,
                            "User sync completed with failures"
                        );
                    }
                }
                Err(SyncError::RateLimited { retry_after }) => {
                    rate_limited += 1;
                    let wait = retry_after
                        .and_then(|d| chrono::Duration::from_std(d).ok())
                        .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_BACKOFF_SECS));
                    self.backoff.insert(key, (), wait, now);
                    tracing::warn!(
                        user_id = user.id,
                        backoff_secs = wait.num_seconds(),
                        "User rate limited, backing off"
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(user_id = user.id, error = %e, "User sync failed");
                }
            }
        }

        tracing::info!(
            users = users.len(),
            ok,
            failed,
            rate_limited,
            alerts_fired,
            "Sync batch finished"
        );
    }
}
