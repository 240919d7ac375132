//! This module provides a local, file-backed implementation of the portal stores
//!
//! In the full portal these tables live in its database; the sync core only ever
//! talks to them through the traits in [`crate::traits`]. [`LocalStore`] is a small
//! JSON-file-backed implementation of those traits, used by the cron binary and by
//! integration tests.

use std::error::Error;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::AttendanceRecord;
use crate::brigade::BrigadeId;
use crate::client::MusterId;
use crate::holidays::{PublicHoliday, Region};
use crate::schedule::TrainingOccurrence;
use crate::traits::{AttendanceStore, EventStore, HolidayStore};

/// A row in the portal's calendar table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    brigade_id: BrigadeId,
    date: NaiveDate,
    start_time: NaiveTime,
    duration_hours: u32,
    title: String,
    is_training: bool,
    muster_id: Option<MusterId>,
}

impl CalendarEvent {
    pub fn new<T: ToString>(
        brigade_id: BrigadeId,
        date: NaiveDate,
        start_time: NaiveTime,
        duration_hours: u32,
        title: T,
        is_training: bool,
    ) -> Self {
        Self {
            brigade_id,
            date,
            start_time,
            duration_hours,
            title: title.to_string(),
            is_training,
            muster_id: None,
        }
    }

    pub fn brigade_id(&self) -> &BrigadeId {
        &self.brigade_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_training(&self) -> bool {
        self.is_training
    }

    /// The DLB muster this event was synced to, if any
    pub fn muster_id(&self) -> Option<&MusterId> {
        self.muster_id.as_ref()
    }
}

#[derive(Default, Debug, PartialEq, Serialize, Deserialize)]
struct StoredData {
    events: Vec<CalendarEvent>,
    holidays: Vec<PublicHoliday>,
    attendance: Vec<AttendanceRecord>,
    last_sync: Option<DateTime<Utc>>,
}

/// Portal-side stores backed by a local JSON file
#[derive(Debug, PartialEq)]
pub struct LocalStore {
    backing_file: PathBuf,
    data: StoredData,
}

impl LocalStore {
    /// Initialize a store from the content of a valid backing file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let data = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self {
            backing_file: PathBuf::from(path),
            data,
        })
    }

    /// Initialize an empty store
    pub fn new(path: &Path) -> Self {
        Self {
            backing_file: PathBuf::from(path),
            data: StoredData::default(),
        }
    }

    /// Store the current content to the backing file
    pub fn save_to_file(&mut self) {
        let path = &self.backing_file;
        let file = match std::fs::File::create(path) {
            Err(err) => {
                log::warn!("Unable to save file {:?}: {}", path, err);
                return;
            },
            Ok(f) => f,
        };

        if let Err(err) = serde_json::to_writer(file, &self.data) {
            log::warn!("Unable to serialize: {}", err);
            return;
        };
    }

    pub fn add_event(&mut self, event: CalendarEvent) {
        self.data.events.push(event);
    }

    pub fn add_holiday(&mut self, holiday: PublicHoliday) {
        self.data.holidays.push(holiday);
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.data.events
    }

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.data.attendance
    }

    /// The last time a sync successfully completed (or None if never)
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.data.last_sync
    }

    /// Update the last sync timestamp to now, or to a custom time in case `timepoint` is `Some`
    pub fn update_last_sync(&mut self, timepoint: Option<DateTime<Utc>>) {
        self.data.last_sync = Some(timepoint.unwrap_or_else(Utc::now));
    }
}

#[async_trait]
impl EventStore for LocalStore {
    async fn exists_training_event(&self, brigade_id: &BrigadeId, date: NaiveDate) -> Result<bool, Box<dyn Error>> {
        Ok(self
            .data
            .events
            .iter()
            .any(|e| e.is_training && e.brigade_id == *brigade_id && e.date == date))
    }

    async fn record_training_event(&mut self, occurrence: &TrainingOccurrence, muster_id: &MusterId) -> Result<(), Box<dyn Error>> {
        let mut event = CalendarEvent::new(
            occurrence.brigade_id().clone(),
            occurrence.actual_date(),
            occurrence.start_time(),
            occurrence.duration_hours(),
            "Training night",
            true,
        );
        event.muster_id = Some(muster_id.clone());
        self.data.events.push(event);
        Ok(())
    }
}

#[async_trait]
impl HolidayStore for LocalStore {
    async fn holidays_for_years(&self, years: &[i32], regions: &[Region]) -> Result<Vec<PublicHoliday>, Box<dyn Error>> {
        use chrono::Datelike;
        Ok(self
            .data
            .holidays
            .iter()
            .filter(|h| years.contains(&h.date().year()) && regions.contains(&h.region()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttendanceStore for LocalStore {
    async fn upsert_attendance(&mut self, records: &[AttendanceRecord]) -> Result<usize, Box<dyn Error>> {
        let mut inserted = 0;
        for record in records {
            let existing = self
                .data
                .attendance
                .iter_mut()
                .find(|r| r.muster_id() == record.muster_id() && r.member_ref() == record.member_ref());
            match existing {
                Some(row) => *row = record.clone(),
                None => {
                    self.data.attendance.push(record.clone());
                    inserted += 1;
                },
            }
        }
        Ok(inserted)
    }
}
