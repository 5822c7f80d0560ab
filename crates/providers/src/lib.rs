//! Wearable-provider clients.
//!
//! Everything vendor-specific lives here: REST calls, payload shapes and
//! field vocabularies. The rest of the workspace sees only the canonical
//! model ([`healthsync_core::merge::DailyRollUp`], [`healthsync_core::Sample`])
//! through the [`ReadingSource`] trait.

pub mod error;
pub mod fitbit;
pub mod intraday;
pub mod source;
pub mod withings;

pub use error::ProviderError;
pub use fitbit::FitbitSource;
pub use source::{AccountInfo, Credential, ReadingSource};
pub use withings::WithingsSource;

/// Canonical provider name for Fitbit-linked accounts.
pub const PROVIDER_FITBIT: &str = "fitbit";
/// Canonical provider name for Withings-linked accounts.
pub const PROVIDER_WITHINGS: &str = "withings";
