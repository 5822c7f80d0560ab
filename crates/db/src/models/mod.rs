//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create/upsert DTO where inserts need one

pub mod current_reading;
pub mod metric;
pub mod notification_state;
pub mod provider_account;
pub mod sync_state;
pub mod user;
