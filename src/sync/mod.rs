//! This module drives the reconciliation between the local schedule and DLB
//!
//! The [`SyncOrchestrator`] combines a remote [`MusterSource`] with the portal's local
//! stores. One run computes the pending training occurrences, creates the matching
//! remote musters one at a time, and aggregates per-item outcomes into a [`SyncRun`].
//! It performs no retries: re-running the whole orchestrator on the next cron cycle is
//! the retry mechanism, and idempotency comes from the local existence filter plus the
//! remote conflict handling.

use chrono::{Datelike, Local, Months, NaiveDate};

use crate::brigade::Brigade;
use crate::config::DlbConfig;
use crate::holidays::{self, Region};
use crate::attendance::AttendanceFilter;
use crate::schedule::{ScheduleGenerator, TrainingOccurrence};
use crate::traits::{AttendanceStore, EventStore, HolidayStore, MusterSource};

pub mod report;
use report::{FeedbackSender, SyncEvent, SyncReporter, SyncRun};

/// Drives muster creation and attendance pulls against the remote system.
///
/// `remote` is usually a [`DlbClient`](crate::client::DlbClient), `local` is usually a
/// [`LocalStore`](crate::store::LocalStore). Integration tests swap both for mocks.
#[derive(Debug)]
pub struct SyncOrchestrator<R, L>
where
    R: MusterSource,
    L: EventStore + HolidayStore + AttendanceStore,
{
    /// The remote muster system
    remote: R,
    /// The portal-side stores
    local: L,
    config: DlbConfig,
}

impl<R, L> SyncOrchestrator<R, L>
where
    R: MusterSource,
    L: EventStore + HolidayStore + AttendanceStore,
{
    pub fn new(remote: R, local: L, config: DlbConfig) -> Self {
        Self { remote, local, config }
    }

    /// Returns the data source described as `local`
    pub fn local(&self) -> &L {
        &self.local
    }
    /// Returns the data source described as `local`
    pub fn local_mut(&mut self) -> &mut L {
        &mut self.local
    }
    /// Returns the data source described as `remote`.
    ///
    /// Apart from tests, there are very few (if any) reasons to access `remote` directly.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Create the remote musters for every pending training occurrence inside the horizon.
    ///
    /// `horizon_months` defaults to the configured `generate_months_ahead`; the horizon
    /// starts today. Failures never propagate out of this function: every remote or local
    /// problem ends up in the returned run's error list, so a single pathological
    /// occurrence cannot crash the cron job.
    pub async fn create_future_musters(&mut self, brigade: &Brigade, horizon_months: Option<u32>) -> SyncRun {
        self.create_future_musters_as_of(brigade, horizon_months, Local::now().date_naive()).await
    }

    /// Same as [`Self::create_future_musters`], with an explicit start date
    pub async fn create_future_musters_as_of(&mut self, brigade: &Brigade, horizon_months: Option<u32>, as_of: NaiveDate) -> SyncRun {
        let mut reporter = SyncReporter::new();
        self.run_muster_sync(brigade, horizon_months, as_of, &mut reporter).await;
        reporter.into_run()
    }

    /// Same as [`Self::create_future_musters`], and provide feedback about the progress
    /// through a watch channel (see [`report::feedback_channel`])
    pub async fn create_future_musters_with_feedback(
        &mut self,
        brigade: &Brigade,
        horizon_months: Option<u32>,
        feedback_sender: FeedbackSender,
    ) -> SyncRun {
        let mut reporter = SyncReporter::new_with_feedback_channel(feedback_sender);
        self.run_muster_sync(brigade, horizon_months, Local::now().date_naive(), &mut reporter).await;
        reporter.into_run()
    }

    async fn run_muster_sync(&mut self, brigade: &Brigade, horizon_months: Option<u32>, as_of: NaiveDate, reporter: &mut SyncReporter) {
        reporter.feedback(SyncEvent::Started);

        if self.guard_configuration(reporter) == false {
            reporter.feedback(SyncEvent::Finished { success: reporter.is_success() });
            return;
        }

        let horizon_months = horizon_months.unwrap_or(self.config.generate_months_ahead);
        reporter.info(&format!(
            "Starting a muster sync for brigade {} ({} months from {})",
            brigade.name(), horizon_months, as_of
        ));

        let occurrences = match self.pending_schedule(brigade, as_of, horizon_months).await {
            Ok(occurrences) => occurrences,
            Err(text) => {
                reporter.error(text);
                reporter.feedback(SyncEvent::Finished { success: false });
                return;
            },
        };

        let (existing, pending): (Vec<_>, Vec<_>) = occurrences.iter().partition(|o| o.exists());
        if existing.is_empty() == false {
            reporter.skipped_many(
                existing.len() as u32,
                &format!("{} occurrences already have a local training event", existing.len()),
            );
        }

        for (index, occurrence) in pending.iter().enumerate() {
            reporter.feedback(SyncEvent::InProgress {
                brigade: brigade.name().to_string(),
                items_done_already: reporter.items_done(),
                details: occurrence.actual_date().to_string(),
            });

            match self.remote.create_muster(occurrence).await {
                Ok(muster_id) => {
                    reporter.created(&format!("Created muster {} for {}", muster_id, occurrence.actual_date()));
                    if let Err(err) = self.local.record_training_event(occurrence, &muster_id).await {
                        reporter.error(format!(
                            "Muster {} was created but could not be recorded locally: {}",
                            muster_id, err
                        ));
                    }
                },
                Err(err) if err.is_conflict() => {
                    // The desired end state is already reached: another actor created it
                    reporter.skipped(&format!("A muster already exists remotely for {}", occurrence.actual_date()));
                },
                Err(err) if err.is_auth_error() => {
                    reporter.failed(format!("{}: {}", occurrence.actual_date(), err.summary()));
                    let remaining = pending.len() - index - 1;
                    if remaining > 0 {
                        reporter.failed_many(
                            remaining as u32,
                            format!("Aborting after an authentication failure; {} occurrences were not attempted", remaining),
                        );
                    }
                    break;
                },
                Err(err) => {
                    reporter.failed(format!("{}: {}", occurrence.actual_date(), err.summary()));
                },
            }
        }

        reporter.info("Muster sync ended");
        reporter.feedback(SyncEvent::Finished { success: reporter.is_success() });
    }

    /// Pull attendance rows for a brigade over a date window and store them locally.
    ///
    /// Newly stored rows count as created, rows that were already known count as skipped.
    pub async fn sync_attendance(&mut self, brigade: &Brigade, from: NaiveDate, to: NaiveDate) -> SyncRun {
        let mut reporter = SyncReporter::new();
        reporter.feedback(SyncEvent::Started);

        if self.guard_configuration(&mut reporter) == false {
            reporter.feedback(SyncEvent::Finished { success: reporter.is_success() });
            return reporter.into_run();
        }

        reporter.info(&format!(
            "Pulling attendance for brigade {} between {} and {}",
            brigade.name(), from, to
        ));

        let filter = AttendanceFilter::for_brigade(brigade.id(), from, to);
        match self.remote.fetch_attendance(&filter).await {
            Err(err) => {
                reporter.failed(format!("Unable to fetch attendance: {}", err.summary()));
            },
            Ok(records) => {
                let total = records.len() as u32;
                match self.local.upsert_attendance(&records).await {
                    Ok(inserted) => {
                        let inserted = inserted as u32;
                        reporter.created_many(inserted, &format!("Stored {} new attendance records", inserted));
                        reporter.skipped_many(total - inserted, &format!("{} records were already known", total - inserted));
                    },
                    Err(err) => {
                        reporter.error(format!("Unable to store attendance records: {}", err));
                    },
                }
            },
        }

        reporter.feedback(SyncEvent::Finished { success: reporter.is_success() });
        reporter.into_run()
    }

    /// Whether the remote system is reachable with the configured credentials.
    /// A disabled integration reports as unreachable without a remote call
    pub async fn test_connection(&self) -> bool {
        if self.config.enabled == false || self.config.has_token() == false {
            return false;
        }
        self.remote.test_connection().await
    }

    /// Check the fail-fast preconditions. No remote call is attempted when this fails
    fn guard_configuration(&self, reporter: &mut SyncReporter) -> bool {
        if self.config.enabled == false {
            reporter.info("DLB integration is disabled, nothing to do");
            return false;
        }
        if self.config.has_token() == false {
            reporter.error("No DLB API token is configured".to_string());
            return false;
        }
        true
    }

    /// Generate the horizon's occurrences with their `exists` flag resolved
    async fn pending_schedule(&self, brigade: &Brigade, as_of: NaiveDate, horizon_months: u32) -> Result<Vec<TrainingOccurrence>, String> {
        let end = as_of
            .checked_add_months(Months::new(horizon_months))
            .unwrap_or(as_of);

        let mut regions = vec![Region::National];
        if brigade.region() != Region::National {
            regions.push(brigade.region());
        }

        let holidays = holidays::resolve(&self.local, as_of.year(), end.year(), &regions)
            .await
            .map_err(|err| format!("Unable to resolve the holiday calendar: {}", err))?;

        ScheduleGenerator::new(holidays)
            .generate(&self.local, brigade, as_of, horizon_months)
            .await
            .map_err(|err| format!("Unable to generate the training schedule: {}", err))
    }
}
