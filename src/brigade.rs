//! Brigades and their training-night recurrence rule

use std::error::Error;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::holidays::Region;

pub type BrigadeId = String;

/// A brigade, which owns a weekly training recurrence rule.
///
/// Immutable for the duration of a sync run; brigade administration happens
/// elsewhere in the portal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Brigade {
    id: BrigadeId,
    name: String,
    region: Region,
    training_weekday: Weekday,
    training_time: NaiveTime,
    duration_hours: u32,
}

impl Brigade {
    pub fn new<I: ToString, N: ToString>(
        id: I,
        name: N,
        region: Region,
        training_weekday: Weekday,
        training_time: NaiveTime,
        duration_hours: u32,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            region,
            training_weekday,
            training_time,
            duration_hours,
        }
    }

    pub fn id(&self) -> &BrigadeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The provincial region used to resolve this brigade's anniversary holiday
    pub fn region(&self) -> Region {
        self.region
    }

    pub fn training_weekday(&self) -> Weekday {
        self.training_weekday
    }

    pub fn training_time(&self) -> NaiveTime {
        self.training_time
    }

    pub fn duration_hours(&self) -> u32 {
        self.duration_hours
    }
}

/// Convert an ISO weekday number (1 = Monday ... 7 = Sunday), as stored by the portal's
/// brigade table, into a [`Weekday`]
pub fn weekday_from_iso(number: u32) -> Result<Weekday, Box<dyn Error>> {
    match number {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        other => Err(format!("Invalid ISO weekday number {}", other).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_weekday_conversion() {
        assert_eq!(weekday_from_iso(1).unwrap(), Weekday::Mon);
        assert_eq!(weekday_from_iso(7).unwrap(), Weekday::Sun);
        assert!(weekday_from_iso(0).is_err());
        assert!(weekday_from_iso(8).is_err());
    }
}
