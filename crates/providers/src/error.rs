//! Provider error taxonomy.

use std::time::Duration;

/// Errors surfaced by a [`crate::ReadingSource`].
///
/// The scheduler keys its per-user handling off these variants:
/// `Unauthorized` flags the account for re-auth, `RateLimited` backs the
/// user off until the deadline, everything else skips the cycle.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The access token was rejected (expired or revoked).
    #[error("access token expired or invalid")]
    Unauthorized,

    /// The provider asked us to back off.
    #[error("rate limited by provider")]
    RateLimited {
        /// Server-suggested wait, when the response carried one.
        retry_after: Option<Duration>,
    },

    /// The provider answered with a non-success status (5xx etc.).
    #[error("provider unavailable: HTTP {0}")]
    Unavailable(u16),

    /// Network-level failure (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response decoded but its shape was not one we know.
    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: reqwest::StatusCode, retry_after: Option<Duration>) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderError::Unauthorized,
            429 => ProviderError::RateLimited { retry_after },
            code => ProviderError::Unavailable(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_mapping() {
        assert_matches!(
            ProviderError::from_status(reqwest::StatusCode::UNAUTHORIZED, None),
            ProviderError::Unauthorized
        );
        assert_matches!(
            ProviderError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(60))),
            ProviderError::RateLimited { retry_after: Some(_) }
        );
        assert_matches!(
            ProviderError::from_status(reqwest::StatusCode::BAD_GATEWAY, None),
            ProviderError::Unavailable(502)
        );
    }
}
