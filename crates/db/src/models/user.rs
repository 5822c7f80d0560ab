//! User entity model.

use serde::Serialize;
use sqlx::FromRow;

use healthsync_core::thresholds::AlertThresholds;
use healthsync_core::types::{DbId, Timestamp};

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Account-level IANA zone, used when no provider reports one.
    pub timezone: Option<String>,
    pub hr_threshold_low: Option<f64>,
    pub hr_threshold_high: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The user's configured heart-rate band.
    pub fn thresholds(&self) -> AlertThresholds {
        AlertThresholds {
            low: self.hr_threshold_low,
            high: self.hr_threshold_high,
        }
    }
}
