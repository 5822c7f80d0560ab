//! Repository for the `metrics_daily` table.

use chrono::NaiveDate;
use sqlx::PgPool;

use healthsync_core::types::DbId;

use crate::models::metric::{MetricDaily, UpsertMetricDaily};

/// Column list for `metrics_daily` SELECT queries.
const COLUMNS: &str = "\
    id, user_id, provider, metric, date_local, \
    value, unit, tz, source_updated_at, created_at, updated_at";

/// Provides query operations for canonical daily metrics.
pub struct MetricDailyRepo;

impl MetricDailyRepo {
    /// Insert-or-update a daily value, keyed by
    /// (user_id, provider, metric, date_local).
    ///
    /// Later writes overwrite the scalar fields (last-write-wins). A NULL
    /// value overwrites with NULL — the store never fabricates a value
    /// where none was observed.
    pub async fn upsert(pool: &PgPool, row: &UpsertMetricDaily) -> Result<MetricDaily, sqlx::Error> {
        let query = format!(
            "INSERT INTO metrics_daily \
                 (user_id, provider, metric, date_local, value, unit, tz, source_updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, provider, metric, date_local) \
             DO UPDATE SET \
                value = EXCLUDED.value, \
                unit = EXCLUDED.unit, \
                tz = EXCLUDED.tz, \
                source_updated_at = EXCLUDED.source_updated_at, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MetricDaily>(&query)
            .bind(row.user_id)
            .bind(&row.provider)
            .bind(&row.metric)
            .bind(row.date_local)
            .bind(row.value)
            .bind(&row.unit)
            .bind(&row.tz)
            .bind(row.source_updated_at)
            .fetch_one(pool)
            .await
    }

    /// Insert-or-update an additive daily counter with a set-if-greater
    /// guarantee: the stored value only ever grows within a key.
    ///
    /// `GREATEST` treats NULL as the absent side, so a real observation
    /// always replaces NULL but a NULL never erases an observation. This
    /// makes monotonicity a storage property rather than a caller
    /// obligation — a stale sync pass carrying a smaller total cannot
    /// regress the row.
    pub async fn upsert_monotonic(
        pool: &PgPool,
        row: &UpsertMetricDaily,
    ) -> Result<MetricDaily, sqlx::Error> {
        let query = format!(
            "INSERT INTO metrics_daily \
                 (user_id, provider, metric, date_local, value, unit, tz, source_updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, provider, metric, date_local) \
             DO UPDATE SET \
                value = GREATEST(metrics_daily.value, EXCLUDED.value), \
                unit = EXCLUDED.unit, \
                tz = EXCLUDED.tz, \
                source_updated_at = COALESCE(EXCLUDED.source_updated_at, metrics_daily.source_updated_at), \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MetricDaily>(&query)
            .bind(row.user_id)
            .bind(&row.provider)
            .bind(&row.metric)
            .bind(row.date_local)
            .bind(row.value)
            .bind(&row.unit)
            .bind(&row.tz)
            .bind(row.source_updated_at)
            .fetch_one(pool)
            .await
    }

    /// Get one daily value.
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
        metric: &str,
        date_local: NaiveDate,
    ) -> Result<Option<MetricDaily>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM metrics_daily \
             WHERE user_id = $1 AND provider = $2 AND metric = $3 AND date_local = $4"
        );
        sqlx::query_as::<_, MetricDaily>(&query)
            .bind(user_id)
            .bind(provider)
            .bind(metric)
            .bind(date_local)
            .fetch_optional(pool)
            .await
    }

    /// Most recent non-null value for a metric across all providers,
    /// searching at most `lookback_days` back from `until` (inclusive).
    ///
    /// Backs the alert engine's daily-aggregate fallback: freshest day
    /// wins, and within a day the most recently updated provider wins.
    pub async fn latest_value(
        pool: &PgPool,
        user_id: DbId,
        metric: &str,
        until: NaiveDate,
        lookback_days: i64,
    ) -> Result<Option<MetricDaily>, sqlx::Error> {
        let since = until - chrono::Duration::days(lookback_days);
        let query = format!(
            "SELECT {COLUMNS} FROM metrics_daily \
             WHERE user_id = $1 AND metric = $2 \
               AND date_local <= $3 AND date_local >= $4 \
               AND value IS NOT NULL \
             ORDER BY date_local DESC, updated_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, MetricDaily>(&query)
            .bind(user_id)
            .bind(metric)
            .bind(until)
            .bind(since)
            .fetch_optional(pool)
            .await
    }

    /// All values for a user and day, across metrics and providers.
    pub async fn list_for_day(
        pool: &PgPool,
        user_id: DbId,
        date_local: NaiveDate,
    ) -> Result<Vec<MetricDaily>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM metrics_daily \
             WHERE user_id = $1 AND date_local = $2 \
             ORDER BY provider, metric"
        );
        sqlx::query_as::<_, MetricDaily>(&query)
            .bind(user_id)
            .bind(date_local)
            .fetch_all(pool)
            .await
    }
}
