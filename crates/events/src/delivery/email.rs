//! Email alert delivery via SMTP.
//!
//! [`EmailNotifier`] wraps the `lettre` async SMTP transport to send
//! plain-text threshold alert emails. Configuration is loaded from
//! environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and no mailer should be
//! constructed.

use async_trait::async_trait;

use healthsync_core::alert::AlertKind;
use healthsync_core::ThresholdAlert;

use crate::notifier::{Notifier, NotifyError};

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@healthsync.local";

/// Configuration for the SMTP alert delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable        | Required | Default                     |
    /// |-----------------|----------|-----------------------------|
    /// | `SMTP_HOST`     | yes      | —                           |
    /// | `SMTP_PORT`     | no       | `587`                       |
    /// | `SMTP_FROM`     | no       | `noreply@healthsync.local`  |
    /// | `SMTP_USER`     | no       | —                           |
    /// | `SMTP_PASSWORD` | no       | —                           |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailNotifier
// ---------------------------------------------------------------------------

/// Sends threshold alert emails via SMTP.
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    /// Create a new email notifier with the given configuration.
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

/// Subject line for one alert.
fn subject(alert: &ThresholdAlert) -> String {
    let side = match alert.kind {
        AlertKind::High => "High",
        AlertKind::Low => "Low",
    };
    format!("HealthSync Alert - {side} {} Detected", metric_label(alert))
}

/// Plain-text body mirroring the structured alert payload.
fn body(user_name: &str, alert: &ThresholdAlert) -> String {
    let direction = match alert.kind {
        AlertKind::High => "exceeded",
        AlertKind::Low => "fallen below",
    };
    format!(
        "Dear {user_name},\n\n\
         We detected that your {label} has {direction} your set threshold.\n\n\
         Current {label}: {value} {unit}\n\
         {side} threshold: {threshold} {unit}\n\
         Time: {time}\n\n\
         If this reading concerns you, please consider checking again, \
         taking a rest if you are active, and contacting your healthcare \
         provider if readings persist.\n\n\
         This is an automated alert from HealthSync. You can adjust your \
         thresholds in your dashboard settings.\n",
        label = metric_label(alert),
        value = alert.value,
        unit = alert.metric.unit(),
        side = match alert.kind {
            AlertKind::High => "High",
            AlertKind::Low => "Low",
        },
        threshold = alert.threshold,
        time = alert.observed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// Human label for the alerting metric.
fn metric_label(alert: &ThresholdAlert) -> &'static str {
    use healthsync_core::Metric;
    match alert.metric {
        Metric::HeartRate | Metric::HeartRateAvg | Metric::HeartRateMin | Metric::HeartRateMax => {
            "Heart Rate"
        }
        Metric::RestingHeartRate => "Resting Heart Rate",
        Metric::Spo2 => "SpO2",
        _ => "Reading",
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_threshold_alert(
        &self,
        recipient: &str,
        user_name: &str,
        alert: &ThresholdAlert,
    ) -> Result<(), NotifyError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(
                self.config
                    .from_address
                    .parse()
                    .map_err(|e| NotifyError::Address(format!("{e}")))?,
            )
            .to(recipient
                .parse()
                .map_err(|e| NotifyError::Address(format!("{e}")))?)
            .subject(subject(alert))
            .header(ContentType::TEXT_PLAIN)
            .body(body(user_name, alert))
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        tracing::info!(
            to = recipient,
            kind = alert.kind.as_str(),
            value = alert.value,
            threshold = alert.threshold,
            "Threshold alert email sent"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use healthsync_core::Metric;

    fn alert(kind: AlertKind) -> ThresholdAlert {
        ThresholdAlert {
            metric: Metric::HeartRate,
            kind,
            value: 130.0,
            threshold: 120.0,
            observed_at: Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        // Ensure SMTP_HOST is not set in the test environment.
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn subject_names_the_side() {
        assert_eq!(
            subject(&alert(AlertKind::High)),
            "HealthSync Alert - High Heart Rate Detected"
        );
        assert_eq!(
            subject(&alert(AlertKind::Low)),
            "HealthSync Alert - Low Heart Rate Detected"
        );
    }

    #[test]
    fn body_carries_the_structured_fields() {
        let text = body("Ada", &alert(AlertKind::High));
        assert!(text.contains("Dear Ada"));
        assert!(text.contains("Current Heart Rate: 130 bpm"));
        assert!(text.contains("High threshold: 120 bpm"));
        assert!(text.contains("2024-06-03 12:00:00 UTC"));
    }
}
