//! Metric entity models and DTOs.
//!
//! Models for canonical daily values and intraday sample series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use healthsync_core::types::{DbId, Timestamp};
use healthsync_core::Sample;

// ---------------------------------------------------------------------------
// Daily metrics
// ---------------------------------------------------------------------------

/// A row from the `metrics_daily` table.
///
/// `value` is nullable: a NULL means no observation for that day, which
/// is distinct from an observed zero.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MetricDaily {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub metric: String,
    pub date_local: NaiveDate,
    pub value: Option<f64>,
    pub unit: String,
    pub tz: Option<String>,
    pub source_updated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for upserting a daily metric row.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertMetricDaily {
    pub user_id: DbId,
    pub provider: String,
    pub metric: String,
    pub date_local: NaiveDate,
    pub value: Option<f64>,
    pub unit: String,
    pub tz: Option<String>,
    pub source_updated_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Intraday series
// ---------------------------------------------------------------------------

/// A row from the `metrics_intraday` table: one whole sample series per
/// (user, provider, metric, local day, resolution).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IntradaySeries {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    pub metric: String,
    pub date_local: NaiveDate,
    pub resolution: String,
    pub start_at_utc: Timestamp,
    pub end_at_utc: Timestamp,
    pub samples: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl IntradaySeries {
    /// Decode the stored JSONB sample blob. Rows written by this service
    /// always decode; a malformed blob reads as empty rather than failing
    /// the caller.
    pub fn decode_samples(&self) -> Vec<Sample> {
        serde_json::from_value(self.samples.clone()).unwrap_or_default()
    }
}

/// DTO for replacing an intraday series.
#[derive(Debug, Clone)]
pub struct ReplaceIntradaySeries {
    pub user_id: DbId,
    pub provider: String,
    pub metric: String,
    pub date_local: NaiveDate,
    pub resolution: String,
    pub start_at_utc: Timestamp,
    pub end_at_utc: Timestamp,
    pub samples: Vec<Sample>,
}
