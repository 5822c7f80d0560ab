//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod current_reading_repo;
pub mod metric_daily_repo;
pub mod metric_intraday_repo;
pub mod notification_state_repo;
pub mod provider_account_repo;
pub mod sync_state_repo;
pub mod user_repo;

pub use current_reading_repo::CurrentReadingRepo;
pub use metric_daily_repo::MetricDailyRepo;
pub use metric_intraday_repo::MetricIntradayRepo;
pub use notification_state_repo::NotificationStateRepo;
pub use provider_account_repo::ProviderAccountRepo;
pub use sync_state_repo::SyncStateRepo;
pub use user_repo::UserRepo;
