//! The delivery seam.

use async_trait::async_trait;

use healthsync_core::ThresholdAlert;

/// Error type for notification delivery failures.
///
/// The alert engine treats any delivery error as retry-worthy: it logs
/// the failure and leaves the suppression state untouched so the alert
/// can fire again on the next cycle.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The channel is not configured (e.g. SMTP_HOST unset).
    #[error("delivery channel not configured")]
    NotConfigured,

    /// The recipient or sender address could not be parsed.
    #[error("address error: {0}")]
    Address(String),

    /// Transport-level failure (connection, authentication, protocol).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Delivers fully-formed threshold alerts to a recipient.
///
/// Implementations own retries and transport concerns; the outcome must
/// be observable to the caller synchronously.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one threshold alert.
    async fn send_threshold_alert(
        &self,
        recipient: &str,
        user_name: &str,
        alert: &ThresholdAlert,
    ) -> Result<(), NotifyError>;
}

/// Stand-in used when no delivery channel is configured. Every send
/// fails with [`NotifyError::NotConfigured`], which keeps suppression
/// state untouched — alerts start flowing as soon as a channel appears.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_threshold_alert(
        &self,
        _recipient: &str,
        _user_name: &str,
        _alert: &ThresholdAlert,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}
