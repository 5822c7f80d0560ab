//! Provider credential entity model.

use serde::Serialize;
use sqlx::FromRow;

use healthsync_core::types::{DbId, Timestamp};

/// A row from the `provider_accounts` table: one linked wearable
/// provider for one user. The access token is an opaque handle; how it
/// was obtained (OAuth) is outside this service.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProviderAccount {
    pub id: DbId,
    pub user_id: DbId,
    pub provider: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub timezone_hint: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
