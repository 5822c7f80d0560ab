//! Per-user pipeline pass.
//!
//! [`sync_user`] runs normalize-and-persist for every linked provider
//! account, then the alert engine. Per-account failures are contained
//! and recorded in `sync_state`; only a rate limit propagates, so the
//! scheduler can back the user off as a whole.

use std::collections::HashMap;
use std::sync::Arc;

use healthsync_core::types::Timestamp;
use healthsync_db::models::sync_state::SYNC_STATUS_PAUSED;
use healthsync_db::models::user::User;
use healthsync_db::repositories::{ProviderAccountRepo, SyncStateRepo};
use healthsync_db::DbPool;
use healthsync_events::Notifier;
use healthsync_providers::{Credential, ReadingSource};

use crate::alert_engine;
use crate::error::SyncError;
use crate::normalizer::{self, SyncOptions, SyncOutcome};
use crate::report::UserSyncReport;

/// Metric family tag for the daily normalize-and-persist stream.
const FAMILY_DAILY: &str = "daily";

/// Provider name → client. Built once at startup and shared.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<&'static str, Arc<dyn ReadingSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, source: Arc<dyn ReadingSource>) -> Self {
        self.sources.insert(source.name(), source);
        self
    }

    pub fn get(&self, provider: &str) -> Option<&Arc<dyn ReadingSource>> {
        self.sources.get(provider)
    }
}

/// Run the full pipeline for one user: sync every linked provider for
/// the user's current local day, then evaluate thresholds.
///
/// Returns `Err` only for failures that apply to the user as a whole
/// (rate limit, storage unavailable). Individual provider failures are
/// recorded and reflected in the report.
pub async fn sync_user(
    pool: &DbPool,
    sources: &SourceRegistry,
    notifier: &dyn Notifier,
    user: &User,
    opts: &SyncOptions,
    now: Timestamp,
) -> Result<UserSyncReport, SyncError> {
    let mut report = UserSyncReport::new(user.id);

    let accounts = ProviderAccountRepo::list_active_for_user(pool, user.id).await?;
    for account in &accounts {
        let Some(source) = sources.get(&account.provider) else {
            tracing::warn!(
                user_id = user.id,
                provider = %account.provider,
                "No client registered for provider, skipping account"
            );
            continue;
        };

        let credential = Credential::new(account.access_token.clone());
        let mut default_tz = account
            .timezone_hint
            .clone()
            .or_else(|| user.timezone.clone());
        if default_tz.is_none() {
            // No stored zone for this account: ask the provider's
            // profile, tolerating failure (the day falls back to UTC).
            match source.resolve_account(&credential).await {
                Ok(info) => default_tz = info.timezone_hint,
                Err(e) => {
                    tracing::debug!(
                        user_id = user.id,
                        provider = %account.provider,
                        error = %e,
                        "Account resolution failed, using default zone"
                    );
                }
            }
        }
        let default_tz = default_tz.as_deref();
        // The provider's idea of "today" drives the requested day.
        let date_local = local_today(default_tz, now);

        match normalizer::sync_day(
            source.as_ref(),
            &credential,
            user.id,
            date_local,
            default_tz,
            opts,
            now,
        )
        .await
        {
            Ok(SyncOutcome::Data(day)) => {
                let counts = normalizer::persist_day(pool, &day).await?;
                report.daily_values_persisted += counts.daily_values;
                report.intraday_series_persisted += counts.intraday_series;
                if day.canonical.fallback_from.is_some() {
                    report.fallback_days += 1;
                }
                report.providers_ok += 1;
                let cursor = day.canonical.date_local.to_string();
                SyncStateRepo::record_ok(
                    pool,
                    user.id,
                    &account.provider,
                    FAMILY_DAILY,
                    Some(cursor.as_str()),
                    now,
                )
                .await?;
            }
            Ok(SyncOutcome::NoData { requested }) => {
                report.empty_days += 1;
                report.providers_ok += 1;
                tracing::debug!(
                    user_id = user.id,
                    provider = %account.provider,
                    requested = %requested,
                    "Sync: lookback exhausted, no data"
                );
                SyncStateRepo::record_ok(pool, user.id, &account.provider, FAMILY_DAILY, None, now)
                    .await?;
            }
            Err(SyncError::Credential) => {
                // Flag for re-auth and stop using the token; the user
                // sees stale data until they relink.
                report.providers_failed += 1;
                tracing::warn!(
                    user_id = user.id,
                    provider = %account.provider,
                    "Sync: credentials rejected, deactivating account"
                );
                ProviderAccountRepo::deactivate(pool, account.id).await?;
                SyncStateRepo::set_status(
                    pool,
                    user.id,
                    &account.provider,
                    FAMILY_DAILY,
                    SYNC_STATUS_PAUSED,
                )
                .await?;
            }
            Err(e @ SyncError::RateLimited { .. }) => {
                // The whole user backs off; remaining accounts get their
                // turn on the next eligible tick.
                SyncStateRepo::record_error(pool, user.id, &account.provider, FAMILY_DAILY)
                    .await?;
                return Err(e);
            }
            Err(e) => {
                report.providers_failed += 1;
                tracing::warn!(
                    user_id = user.id,
                    provider = %account.provider,
                    error = %e,
                    "Sync: provider failed this cycle"
                );
                SyncStateRepo::record_error(pool, user.id, &account.provider, FAMILY_DAILY)
                    .await?;
            }
        }
    }

    // Alerting runs even when every provider failed: the engine reads
    // stored data, and stale data is still worth evaluating once.
    let alert_outcome = alert_engine::evaluate_user(pool, notifier, user, now).await?;
    report.alerts_fired = alert_outcome.fired;
    report.alert_dispatch_failures = alert_outcome.dispatch_failures;

    Ok(report)
}

/// Today's date in the given zone, falling back to UTC.
fn local_today(tz_name: Option<&str>, now: Timestamp) -> chrono::NaiveDate {
    use chrono_tz::Tz;
    match tz_name.and_then(|name| name.parse::<Tz>().ok()) {
        Some(tz) => now.with_timezone(&tz).date_naive(),
        None => now.date_naive(),
    }
}
