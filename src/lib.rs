//! This crate synchronises a volunteer fire brigade's training-night schedule with the
//! external DLB attendance system.
//!
//! It computes a brigade's recurring training occurrences over a horizon, aware of the
//! regional public-holiday calendar (see the [`holidays`] module): an occurrence that
//! collides with a holiday is moved to the next day. \
//! Pending occurrences are then reconciled against DLB through the [`client`] module,
//! which can be used as a stand-alone module.
//!
//! The [`SyncOrchestrator`](sync::SyncOrchestrator) drives a whole run: it is safe to
//! re-run repeatedly (the monthly cron does exactly that), tolerates partial failure,
//! and aggregates per-item outcomes into a [`SyncRun`](sync::report::SyncRun) that the
//! caller turns into logs and a process exit code.

pub mod traits;

pub mod brigade;
pub use brigade::Brigade;
pub mod holidays;
pub use holidays::{HolidayCalendar, PublicHoliday, Region};
pub mod schedule;
pub use schedule::{ScheduleGenerator, TrainingOccurrence};
mod error;
pub use error::ApiError;
pub mod sync;
pub use sync::SyncOrchestrator;

pub mod client;
pub mod store;

pub mod attendance;
pub mod config;
