//! Sync error taxonomy.

use std::time::Duration;

use healthsync_providers::ProviderError;

/// Errors from one user's sync-and-alert pass.
///
/// The scheduler keys its handling off the variant: `Credential` flags
/// the account for re-auth, `RateLimited` backs the user off until the
/// deadline, the rest skip the cycle and surface in the batch summary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Provider rejected the stored credential.
    #[error("credentials rejected by provider")]
    Credential,

    /// Provider asked us to back off; retry no earlier than the deadline.
    #[error("rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },

    /// Transient provider failure (network, 5xx).
    #[error("transient provider failure: {0}")]
    Provider(String),

    /// Payload shape problems that survived the per-sample skipping.
    #[error("payload shape error: {0}")]
    Shape(String),

    /// A storage write failed; the upsert it aborted left prior state
    /// untouched.
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl From<ProviderError> for SyncError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Unauthorized => SyncError::Credential,
            ProviderError::RateLimited { retry_after } => SyncError::RateLimited { retry_after },
            ProviderError::Unavailable(code) => SyncError::Provider(format!("HTTP {code}")),
            ProviderError::Transport(e) => SyncError::Provider(e.to_string()),
            ProviderError::Shape(msg) => SyncError::Shape(msg),
        }
    }
}
