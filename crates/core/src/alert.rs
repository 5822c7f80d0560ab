//! Threshold violation alert types.

use serde::Serialize;

use crate::metric::Metric;
use crate::types::Timestamp;

/// Which side of the configured band was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Value exceeded the high threshold.
    High,
    /// Value fell below the low threshold.
    Low,
}

impl AlertKind {
    /// Wire/display name ("high" / "low").
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::High => "high",
            AlertKind::Low => "low",
        }
    }
}

/// A single threshold violation the engine decided to notify about.
#[derive(Debug, Clone, Serialize)]
pub struct ThresholdAlert {
    /// The metric that crossed its band.
    pub metric: Metric,
    /// High or low side.
    pub kind: AlertKind,
    /// The observed value that triggered the alert.
    pub value: f64,
    /// The configured threshold that was crossed.
    pub threshold: f64,
    /// When the value was observed.
    pub observed_at: Timestamp,
}
