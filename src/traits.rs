//! The seams between the sync core and its collaborators
//!
//! The remote DLB system and the portal's local stores are only ever reached through
//! these traits, so the orchestrator can be driven against mocks in integration tests
//! the same way the production binary drives it against [`DlbClient`](crate::client::DlbClient)
//! and [`LocalStore`](crate::store::LocalStore).

use std::error::Error;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::attendance::{AttendanceFilter, AttendanceRecord};
use crate::brigade::BrigadeId;
use crate::client::MusterId;
use crate::error::ApiError;
use crate::holidays::{PublicHoliday, Region};
use crate::schedule::TrainingOccurrence;

/// The remote muster/attendance system (DLB).
///
/// Implementations perform no retries; retry policy belongs to the orchestrator.
#[async_trait]
pub trait MusterSource {
    /// Create a muster for a training occurrence, returning the remote id.
    ///
    /// Transport failures and non-2xx responses are both reported as [`ApiError`];
    /// no raw transport error ever crosses this boundary.
    async fn create_muster(&self, occurrence: &TrainingOccurrence) -> Result<MusterId, ApiError>;

    /// Fetch attendance rows matching a filter
    async fn fetch_attendance(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>, ApiError>;

    /// Whether the remote system is reachable with the configured credentials
    async fn test_connection(&self) -> bool;
}

/// The portal's calendar store, queried for already-materialized training events
#[async_trait]
pub trait EventStore {
    /// Whether a training event already exists for this brigade on this date.
    /// This is the idempotency guard that makes repeated sync runs safe
    async fn exists_training_event(&self, brigade_id: &BrigadeId, date: NaiveDate) -> Result<bool, Box<dyn Error>>;

    /// Record a training event for a freshly-created muster, so the next run sees it
    async fn record_training_event(&mut self, occurrence: &TrainingOccurrence, muster_id: &MusterId) -> Result<(), Box<dyn Error>>;
}

/// The portal's persisted holiday table
#[async_trait]
pub trait HolidayStore {
    /// Every persisted holiday for the given years and regions. An empty result for a
    /// `(year, region)` pair means the computed calendar will be used for it instead
    async fn holidays_for_years(&self, years: &[i32], regions: &[Region]) -> Result<Vec<PublicHoliday>, Box<dyn Error>>;
}

/// The portal's attendance table
#[async_trait]
pub trait AttendanceStore {
    /// Insert the records that are not stored yet, returning how many were new
    async fn upsert_attendance(&mut self, records: &[AttendanceRecord]) -> Result<usize, Box<dyn Error>>;
}
