//! Repository for the `notification_state` table.

use sqlx::PgPool;

use healthsync_core::alert::AlertKind;
use healthsync_core::types::{DbId, Timestamp};

use crate::models::notification_state::NotificationState;

/// Column list for `notification_state` queries.
const COLUMNS: &str = "\
    id, user_id, last_max_notified, last_min_notified, \
    last_notification_time, created_at, updated_at";

/// Provides query operations for per-user alert suppression state.
pub struct NotificationStateRepo;

impl NotificationStateRepo {
    /// Get the state row for a user, if one exists.
    pub async fn get(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<NotificationState>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_state WHERE user_id = $1");
        sqlx::query_as::<_, NotificationState>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Create the row lazily on a user's first evaluation.
    ///
    /// The fresh row carries `last_notification_time = now` and no
    /// last-notified values, so the very first violation always fires.
    /// Concurrent creation is safe: on conflict the existing row wins.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<NotificationState, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_state (user_id, last_notification_time) \
             VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationState>(&query)
            .bind(user_id)
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Record a successfully dispatched notification.
    ///
    /// Updates the side that fired plus `last_notification_time` in one
    /// statement. Called only after the notifier reported success —
    /// a failed dispatch must leave the row untouched so the alert can
    /// retry on the next cycle.
    pub async fn record_notified(
        pool: &PgPool,
        user_id: DbId,
        kind: AlertKind,
        value: f64,
        now: Timestamp,
    ) -> Result<NotificationState, sqlx::Error> {
        let side_column = match kind {
            AlertKind::High => "last_max_notified",
            AlertKind::Low => "last_min_notified",
        };
        let query = format!(
            "UPDATE notification_state \
             SET {side_column} = $2, last_notification_time = $3, updated_at = NOW() \
             WHERE user_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationState>(&query)
            .bind(user_id)
            .bind(value)
            .bind(now)
            .fetch_one(pool)
            .await
    }
}
