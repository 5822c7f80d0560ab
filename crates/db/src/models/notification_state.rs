//! Per-user alert suppression state.

use serde::Serialize;
use sqlx::FromRow;

use healthsync_core::thresholds::SuppressionState;
use healthsync_core::types::{DbId, Timestamp};

/// A row from the `notification_state` table. Created lazily on a
/// user's first evaluation; mutated only after a notification actually
/// dispatched.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationState {
    pub id: DbId,
    pub user_id: DbId,
    pub last_max_notified: Option<f64>,
    pub last_min_notified: Option<f64>,
    pub last_notification_time: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationState {
    /// View of this row as the decision engine's suppression input.
    pub fn suppression(&self) -> SuppressionState {
        SuppressionState {
            last_max_notified: self.last_max_notified,
            last_min_notified: self.last_min_notified,
            last_notification_time: self.last_notification_time,
        }
    }
}
