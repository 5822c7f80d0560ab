//! Per-user sync outcome reporting.

use healthsync_core::types::DbId;

/// What one user's pipeline pass accomplished.
///
/// Returned to the scheduler so failures aggregate into an observable
/// batch summary instead of disappearing into catch-and-continue.
#[derive(Debug, Default, Clone)]
pub struct UserSyncReport {
    pub user_id: DbId,
    /// Provider accounts synced without error.
    pub providers_ok: usize,
    /// Provider accounts that failed this cycle (error recorded in
    /// `sync_state`, cycle skipped).
    pub providers_failed: usize,
    /// Daily metric values upserted.
    pub daily_values_persisted: usize,
    /// Intraday series replaced.
    pub intraday_series_persisted: usize,
    /// Days that resolved through fallback lookback.
    pub fallback_days: usize,
    /// Days that exhausted lookback with no data.
    pub empty_days: usize,
    /// Threshold alerts dispatched successfully.
    pub alerts_fired: usize,
    /// Alerts whose dispatch failed (suppression state left untouched).
    pub alert_dispatch_failures: usize,
}

impl UserSyncReport {
    pub fn new(user_id: DbId) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }
}
