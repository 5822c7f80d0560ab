//! Incremental sync bookkeeping.

use serde::Serialize;
use sqlx::FromRow;

use healthsync_core::types::{DbId, Timestamp};

/// Sync status recorded after each per-user pass.
pub const SYNC_STATUS_OK: &str = "ok";
/// Sync status recorded when the last pass failed.
pub const SYNC_STATUS_ERROR: &str = "error";
/// Sync status for accounts flagged for re-authorization.
pub const SYNC_STATUS_PAUSED: &str = "paused";

/// A row from the `sync_state` table: progress and health of one
/// (user, provider, metric family) sync stream.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SyncState {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub metric_family: String,
    /// Last date/time/id fetched, provider-specific.
    pub cursor: Option<String>,
    pub last_synced_at: Option<Timestamp>,
    pub status: Option<String>,
    pub error_count: i32,
    pub updated_at: Timestamp,
}
