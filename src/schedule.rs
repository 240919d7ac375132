//! Training-night schedule generation
//!
//! A [`ScheduleGenerator`] turns a brigade's weekly recurrence rule into the concrete
//! [`TrainingOccurrence`]s inside a horizon, shifting occurrences that collide with a
//! public holiday to the next day. Generation is pure and restartable: every call
//! recomputes from scratch, so two calls with the same inputs yield identical lists.

use std::error::Error;

use chrono::{Duration, Months, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::brigade::{Brigade, BrigadeId};
use crate::holidays::HolidaySet;
use crate::traits::EventStore;

/// One concrete calendar instance of a brigade's recurring training night.
///
/// `actual_date` equals `scheduled_date` unless a holiday collision forced a one-day
/// shift. Occurrences are computed values; they are never mutated after generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingOccurrence {
    brigade_id: BrigadeId,
    scheduled_date: NaiveDate,
    actual_date: NaiveDate,
    start_time: NaiveTime,
    duration_hours: u32,
    holiday_shifted: bool,
    holiday_name: Option<String>,
    exists: bool,
}

impl TrainingOccurrence {
    pub fn brigade_id(&self) -> &BrigadeId {
        &self.brigade_id
    }

    /// The date the recurrence rule put this occurrence on
    pub fn scheduled_date(&self) -> NaiveDate {
        self.scheduled_date
    }

    /// The date the training actually happens on, after holiday adjustment
    pub fn actual_date(&self) -> NaiveDate {
        self.actual_date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn duration_hours(&self) -> u32 {
        self.duration_hours
    }

    pub fn is_holiday_shifted(&self) -> bool {
        self.holiday_shifted
    }

    /// The holiday that forced the shift, if any
    pub fn holiday_name(&self) -> Option<&str> {
        self.holiday_name.as_deref()
    }

    /// Whether a training event for this date is already in the local calendar store
    pub fn exists(&self) -> bool {
        self.exists
    }
}

/// Generates the training-night occurrences of a brigade against a holiday set
#[derive(Clone, Debug)]
pub struct ScheduleGenerator {
    holidays: HolidaySet,
}

impl ScheduleGenerator {
    pub fn new(holidays: HolidaySet) -> Self {
        Self { holidays }
    }

    /// The occurrences between `as_of` and `as_of + horizon_months` (inclusive),
    /// ordered by actual date, with every `exists` flag still `false`.
    ///
    /// An occurrence whose scheduled date is a holiday is moved one day forward and
    /// keeps the holiday's name. The shift is applied at most once: if the following
    /// day is also a holiday (a Christmas/Boxing Day week), the occurrence stays on
    /// that second day. Cascading further is deliberately not done.
    pub fn occurrences(&self, brigade: &Brigade, as_of: NaiveDate, horizon_months: u32) -> Vec<TrainingOccurrence> {
        let end = match as_of.checked_add_months(Months::new(horizon_months)) {
            Some(end) => end,
            None => return Vec::new(),
        };

        let mut occurrences = Vec::new();
        let mut candidate = first_on_or_after(as_of, brigade);
        while candidate <= end {
            occurrences.push(self.occurrence_on(brigade, candidate));
            candidate = candidate + Duration::days(7);
        }
        occurrences
    }

    /// Like [`Self::occurrences`], but with each occurrence checked against the local
    /// event store and its `exists` flag set accordingly
    pub async fn generate<S>(
        &self,
        store: &S,
        brigade: &Brigade,
        as_of: NaiveDate,
        horizon_months: u32,
    ) -> Result<Vec<TrainingOccurrence>, Box<dyn Error>>
    where
        S: EventStore + ?Sized,
    {
        let mut occurrences = self.occurrences(brigade, as_of, horizon_months);
        for occurrence in occurrences.iter_mut() {
            occurrence.exists = store
                .exists_training_event(brigade.id(), occurrence.actual_date)
                .await?;
        }
        Ok(occurrences)
    }

    fn occurrence_on(&self, brigade: &Brigade, scheduled_date: NaiveDate) -> TrainingOccurrence {
        let (actual_date, holiday_name) = match self.holidays.get(scheduled_date) {
            Some(holiday) => {
                log::debug!(
                    "Training on {} collides with {}, shifting to the next day",
                    scheduled_date,
                    holiday.name()
                );
                (scheduled_date + Duration::days(1), Some(holiday.name().to_string()))
            },
            None => (scheduled_date, None),
        };

        TrainingOccurrence {
            brigade_id: brigade.id().clone(),
            scheduled_date,
            actual_date,
            start_time: brigade.training_time(),
            duration_hours: brigade.duration_hours(),
            holiday_shifted: holiday_name.is_some(),
            holiday_name,
            exists: false,
        }
    }
}

/// The first date on or after `as_of` falling on the brigade's training weekday
fn first_on_or_after(as_of: NaiveDate, brigade: &Brigade) -> NaiveDate {
    use chrono::Datelike;
    let target = brigade.training_weekday().num_days_from_monday() as i64;
    let current = as_of.weekday().num_days_from_monday() as i64;
    as_of + Duration::days((target - current).rem_euclid(7))
}
