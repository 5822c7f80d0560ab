//! Repository for the `metrics_intraday` table.

use chrono::NaiveDate;
use sqlx::PgPool;

use healthsync_core::types::DbId;

use crate::models::metric::{IntradaySeries, ReplaceIntradaySeries};

/// Column list for `metrics_intraday` queries.
const COLUMNS: &str = "\
    id, user_id, provider, metric, date_local, resolution, \
    start_at_utc, end_at_utc, samples, created_at, updated_at";

/// Provides query operations for intraday sample series.
pub struct MetricIntradayRepo;

impl MetricIntradayRepo {
    /// Replace the whole series stored under
    /// (user_id, provider, metric, date_local, resolution).
    ///
    /// Never appends individual samples: providers revise recent
    /// intraday windows wholesale, so the newest window wins outright.
    /// The upsert is a single statement, so no partially-written series
    /// is ever visible.
    pub async fn replace(
        pool: &PgPool,
        series: &ReplaceIntradaySeries,
    ) -> Result<IntradaySeries, sqlx::Error> {
        let samples = serde_json::to_value(&series.samples)
            .expect("samples serialize to JSON");
        let query = format!(
            "INSERT INTO metrics_intraday \
                 (user_id, provider, metric, date_local, resolution, \
                  start_at_utc, end_at_utc, samples) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, provider, metric, date_local, resolution) \
             DO UPDATE SET \
                start_at_utc = EXCLUDED.start_at_utc, \
                end_at_utc = EXCLUDED.end_at_utc, \
                samples = EXCLUDED.samples, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, IntradaySeries>(&query)
            .bind(series.user_id)
            .bind(&series.provider)
            .bind(&series.metric)
            .bind(series.date_local)
            .bind(&series.resolution)
            .bind(series.start_at_utc)
            .bind(series.end_at_utc)
            .bind(samples)
            .fetch_one(pool)
            .await
    }

    /// Get the stored series for one key.
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
        metric: &str,
        date_local: NaiveDate,
        resolution: &str,
    ) -> Result<Option<IntradaySeries>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM metrics_intraday \
             WHERE user_id = $1 AND provider = $2 AND metric = $3 \
               AND date_local = $4 AND resolution = $5"
        );
        sqlx::query_as::<_, IntradaySeries>(&query)
            .bind(user_id)
            .bind(provider)
            .bind(metric)
            .bind(date_local)
            .bind(resolution)
            .fetch_optional(pool)
            .await
    }

    /// Delete series older than the given local-date cutoff. Returns the
    /// number of rows deleted.
    pub async fn delete_older_than(
        pool: &PgPool,
        cutoff: NaiveDate,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM metrics_intraday WHERE date_local < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
