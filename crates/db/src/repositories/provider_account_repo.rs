//! Repository for the `provider_accounts` table.

use sqlx::PgPool;

use healthsync_core::types::DbId;

use crate::models::provider_account::ProviderAccount;

/// Column list for `provider_accounts` queries.
const COLUMNS: &str = "\
    id, user_id, provider, access_token, timezone_hint, \
    is_active, created_at, updated_at";

/// Provides query operations for linked provider credentials.
pub struct ProviderAccountRepo;

impl ProviderAccountRepo {
    /// Active provider links for a user.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ProviderAccount>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM provider_accounts \
             WHERE user_id = $1 AND is_active \
             ORDER BY provider"
        );
        sqlx::query_as::<_, ProviderAccount>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Deactivate a link whose credential was rejected by the provider.
    /// The account stays on record for re-authorization.
    pub async fn deactivate(pool: &PgPool, account_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE provider_accounts \
             SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(account_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
