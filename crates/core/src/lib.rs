//! HealthSync core domain logic.
//!
//! Pure types and algorithms shared by the rest of the workspace — no
//! database access, no network I/O:
//!
//! - [`metric`] — the canonical metric catalogue (names, units, additivity).
//! - [`day_window`] — local-calendar-day to UTC instant-range resolution.
//! - [`merge`] — roll-up vs. intraday reconciliation into canonical daily
//!   records.
//! - [`thresholds`] — the threshold alert decision engine.
//! - [`correlation`] — TTL-bounded correlation store for transient
//!   per-user state (backoff deadlines, pending re-auth).

pub mod alert;
pub mod correlation;
pub mod day_window;
pub mod merge;
pub mod metric;
pub mod sample;
pub mod thresholds;
pub mod types;

pub use alert::{AlertKind, ThresholdAlert};
pub use metric::Metric;
pub use sample::Sample;
