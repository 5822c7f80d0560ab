//! Repository for the `current_readings` table.

use sqlx::PgPool;

use healthsync_core::types::{DbId, Timestamp};

use crate::models::current_reading::CurrentReading;

/// Column list for `current_readings` queries.
const COLUMNS: &str = "id, user_id, metric, value, measured_at_utc, updated_at";

/// Provides query operations for the live current-reading cache.
pub struct CurrentReadingRepo;

impl CurrentReadingRepo {
    /// Upsert the latest live reading for (user, metric).
    ///
    /// Only moves forward in time: an older measurement never replaces a
    /// newer one, so out-of-order syncs cannot regress the cache.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        metric: &str,
        value: f64,
        measured_at_utc: Timestamp,
    ) -> Result<CurrentReading, sqlx::Error> {
        let query = format!(
            "INSERT INTO current_readings (user_id, metric, value, measured_at_utc) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, metric) \
             DO UPDATE SET \
                value = CASE WHEN EXCLUDED.measured_at_utc >= current_readings.measured_at_utc \
                             THEN EXCLUDED.value ELSE current_readings.value END, \
                measured_at_utc = GREATEST(current_readings.measured_at_utc, EXCLUDED.measured_at_utc), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CurrentReading>(&query)
            .bind(user_id)
            .bind(metric)
            .bind(value)
            .bind(measured_at_utc)
            .fetch_one(pool)
            .await
    }

    /// Get the cached live reading for (user, metric).
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
        metric: &str,
    ) -> Result<Option<CurrentReading>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM current_readings WHERE user_id = $1 AND metric = $2");
        sqlx::query_as::<_, CurrentReading>(&query)
            .bind(user_id)
            .bind(metric)
            .fetch_optional(pool)
            .await
    }
}
