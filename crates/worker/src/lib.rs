//! Background sync worker.
//!
//! [`scheduler::SyncScheduler`] drives the pipeline for the full user
//! set on a fixed interval. Spawn [`scheduler::SyncScheduler::run`] via
//! `tokio::spawn`; it exits gracefully when its [`tokio_util::sync::CancellationToken`]
//! is cancelled.

pub mod scheduler;

pub use scheduler::SyncScheduler;
