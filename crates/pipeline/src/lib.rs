//! The sync-and-alert pipeline.
//!
//! One pass per user per scheduler tick:
//!
//! 1. [`normalizer`] pulls each linked provider's roll-up and intraday
//!    data for the day, reconciles them and persists the canonical
//!    record (fetch order is fixed: roll-up, then intraday, then
//!    persistence — the intraday window depends on the roll-up's
//!    timezone).
//! 2. [`alert_engine`] picks the freshest available reading, runs the
//!    threshold decision and dispatches notifications.
//!
//! Failures are contained at the per-user boundary and reported as
//! typed results — one user's broken provider never aborts the batch.

pub mod alert_engine;
pub mod error;
pub mod normalizer;
pub mod report;
pub mod sync;

pub use error::SyncError;
pub use report::UserSyncReport;
pub use sync::{sync_user, SourceRegistry};
