//! Repository for the `users` table.

use sqlx::PgPool;

use healthsync_core::types::DbId;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "\
    id, email, display_name, timezone, \
    hr_threshold_low, hr_threshold_high, created_at, updated_at";

/// Provides query operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Get a user by id.
    pub async fn get(pool: &PgPool, user_id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// All users with at least one active provider account — the
    /// scheduler's working set.
    pub async fn list_syncable(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = "\
            SELECT DISTINCT ON (u.id) \
                u.id, u.email, u.display_name, u.timezone, \
                u.hr_threshold_low, u.hr_threshold_high, u.created_at, u.updated_at \
            FROM users u \
            JOIN provider_accounts pa ON pa.user_id = u.id AND pa.is_active \
            ORDER BY u.id";
        sqlx::query_as::<_, User>(query).fetch_all(pool).await
    }

    /// Users with a configured heart-rate band — the alert engine's
    /// working set.
    pub async fn list_with_thresholds(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE hr_threshold_low IS NOT NULL OR hr_threshold_high IS NOT NULL \
             ORDER BY id"
        );
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Update a user's heart-rate band.
    pub async fn set_thresholds(
        pool: &PgPool,
        user_id: DbId,
        low: Option<f64>,
        high: Option<f64>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users \
             SET hr_threshold_low = $2, hr_threshold_high = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(user_id)
        .bind(low)
        .bind(high)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
