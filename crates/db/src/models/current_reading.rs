//! Live current-reading cache.

use serde::Serialize;
use sqlx::FromRow;

use healthsync_core::types::{DbId, Timestamp};

/// A row from the `current_readings` table: the single latest live
/// value per (user, metric), refreshed from the freshest intraday
/// sample on every sync.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CurrentReading {
    pub id: DbId,
    pub user_id: DbId,
    pub metric: String,
    pub value: f64,
    pub measured_at_utc: Timestamp,
    pub updated_at: Timestamp,
}
