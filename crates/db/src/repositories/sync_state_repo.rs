//! Repository for the `sync_state` table.

use sqlx::PgPool;

use healthsync_core::types::{DbId, Timestamp};

use crate::models::sync_state::{SyncState, SYNC_STATUS_ERROR, SYNC_STATUS_OK};

/// Column list for `sync_state` queries.
const COLUMNS: &str = "\
    id, user_id, provider, metric_family, cursor, \
    last_synced_at, status, error_count, updated_at";

/// Provides query operations for per-stream sync bookkeeping.
pub struct SyncStateRepo;

impl SyncStateRepo {
    /// Record a successful pass: status ok, error count reset, cursor
    /// advanced.
    pub async fn record_ok(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
        metric_family: &str,
        cursor: Option<&str>,
        synced_at: Timestamp,
    ) -> Result<SyncState, sqlx::Error> {
        let query = format!(
            "INSERT INTO sync_state \
                 (user_id, provider, metric_family, cursor, last_synced_at, status, error_count) \
             VALUES ($1, $2, $3, $4, $5, $6, 0) \
             ON CONFLICT (user_id, provider, metric_family) \
             DO UPDATE SET \
                cursor = EXCLUDED.cursor, \
                last_synced_at = EXCLUDED.last_synced_at, \
                status = EXCLUDED.status, \
                error_count = 0, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SyncState>(&query)
            .bind(user_id)
            .bind(provider)
            .bind(metric_family)
            .bind(cursor)
            .bind(synced_at)
            .bind(SYNC_STATUS_OK)
            .fetch_one(pool)
            .await
    }

    /// Record a failed pass: status error, error count incremented,
    /// cursor left where it was.
    pub async fn record_error(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
        metric_family: &str,
    ) -> Result<SyncState, sqlx::Error> {
        let query = format!(
            "INSERT INTO sync_state \
                 (user_id, provider, metric_family, status, error_count) \
             VALUES ($1, $2, $3, $4, 1) \
             ON CONFLICT (user_id, provider, metric_family) \
             DO UPDATE SET \
                status = EXCLUDED.status, \
                error_count = sync_state.error_count + 1, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SyncState>(&query)
            .bind(user_id)
            .bind(provider)
            .bind(metric_family)
            .bind(SYNC_STATUS_ERROR)
            .fetch_one(pool)
            .await
    }

    /// Mark a stream paused (e.g. credentials flagged for re-auth).
    pub async fn set_status(
        pool: &PgPool,
        user_id: DbId,
        provider: &str,
        metric_family: &str,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO sync_state (user_id, provider, metric_family, status) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, provider, metric_family) \
             DO UPDATE SET status = EXCLUDED.status, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(provider)
        .bind(metric_family)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// All streams for a user, for operational inspection.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<SyncState>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sync_state \
             WHERE user_id = $1 \
             ORDER BY provider, metric_family"
        );
        sqlx::query_as::<_, SyncState>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
