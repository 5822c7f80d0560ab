//! The provider seam.

use async_trait::async_trait;
use chrono::NaiveDate;

use healthsync_core::merge::DailyRollUp;
use healthsync_core::types::Timestamp;
use healthsync_core::{Metric, Sample};

use crate::error::ProviderError;

/// An opaque access handle for one linked account. How it was obtained
/// (OAuth) is outside this service; it is passed through verbatim.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

/// Account facts resolvable from a credential alone.
#[derive(Debug, Clone, Default)]
pub struct AccountInfo {
    /// The provider's own id for the account, when exposed.
    pub provider_user_id: Option<String>,
    /// IANA zone the provider buckets this account's days in.
    pub timezone_hint: Option<String>,
}

/// A source of per-user physiological readings.
///
/// One implementation per wearable vendor. All methods are blocking
/// awaits with a bounded request timeout; none retries internally —
/// retry policy belongs to the scheduler.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Canonical provider name (the `provider` column value).
    fn name(&self) -> &'static str;

    /// Resolve account facts (timezone) from the credential.
    async fn resolve_account(&self, credential: &Credential) -> Result<AccountInfo, ProviderError>;

    /// The provider's daily roll-up for one local calendar date.
    ///
    /// `Ok(None)` means the provider answered but has nothing for that
    /// day — distinct from an error.
    async fn fetch_daily(
        &self,
        credential: &Credential,
        date: NaiveDate,
    ) -> Result<Option<DailyRollUp>, ProviderError>;

    /// Intraday samples for one metric covering `[start_utc, end_utc)`.
    ///
    /// Returns a time-sorted, timestamp-unique list; samples the
    /// provider sent in an unparseable form are skipped, never fatal.
    async fn fetch_intraday(
        &self,
        credential: &Credential,
        metric: Metric,
        start_utc: Timestamp,
        end_utc: Timestamp,
    ) -> Result<Vec<Sample>, ProviderError>;

    /// Metrics this provider can serve intraday. Only these are fetched
    /// inside the day window; everything else comes from the roll-up.
    fn intraday_metrics(&self) -> &'static [Metric];
}
