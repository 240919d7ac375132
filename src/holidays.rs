//! New Zealand public holidays, computed per region and year
//!
//! Holiday dates are deterministic: two calls with the same `(year, region)` inputs
//! always return the same set, which is what makes schedule generation idempotent.
//! Persisted holiday rows (officially announced dates) take precedence over the
//! computed set, see [`resolve`].

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::traits::HolidayStore;

/// A holiday region: either nation-wide, or one of the provincial anniversary regions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    National,
    Auckland,
    Wellington,
    Nelson,
    Otago,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::National => "national",
            Region::Auckland => "auckland",
            Region::Wellington => "wellington",
            Region::Nelson => "nelson",
            Region::Otago => "otago",
        }
    }

    /// The anniversary-day anchor `(month, day, name)` for provincial regions.
    ///
    /// The observed holiday is the Monday nearest to this anchor, see
    /// [`HolidayCalendar::nearest_monday`]
    fn anniversary_anchor(&self) -> Option<(u32, u32, &'static str)> {
        match self {
            Region::National => None,
            Region::Auckland => Some((1, 29, "Auckland Anniversary Day")),
            Region::Wellington => Some((1, 22, "Wellington Anniversary Day")),
            Region::Nelson => Some((2, 1, "Nelson Anniversary Day")),
            Region::Otago => Some((3, 23, "Otago Anniversary Day")),
        }
    }
}

impl FromStr for Region {
    type Err = Box<dyn Error>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "national" => Ok(Region::National),
            "auckland" => Ok(Region::Auckland),
            "wellington" => Ok(Region::Wellington),
            "nelson" => Ok(Region::Nelson),
            "otago" => Ok(Region::Otago),
            other => Err(format!("Unknown holiday region {:?}", other).into()),
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single public holiday, either computed or loaded from the persisted holiday table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicHoliday {
    date: NaiveDate,
    name: String,
    region: Region,
}

impl PublicHoliday {
    pub fn new<N: ToString>(date: NaiveDate, name: N, region: Region) -> Self {
        Self { date, name: name.to_string(), region }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> Region {
        self.region
    }
}

/// An immutable date-indexed set of holidays, as consumed by the schedule generator.
///
/// When two regions observe a holiday on the same date, the first one inserted wins
/// (national holidays are emitted before regional ones).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HolidaySet {
    by_date: BTreeMap<NaiveDate, PublicHoliday>,
}

impl HolidaySet {
    pub fn from_holidays<I: IntoIterator<Item = PublicHoliday>>(holidays: I) -> Self {
        let mut by_date = BTreeMap::new();
        for holiday in holidays {
            by_date.entry(holiday.date()).or_insert(holiday);
        }
        Self { by_date }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&PublicHoliday> {
        self.by_date.get(&date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.by_date.contains_key(&date)
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PublicHoliday> {
        self.by_date.values()
    }
}

/// Computes public-holiday dates for a region and a range of years
pub struct HolidayCalendar;

impl HolidayCalendar {
    /// Every holiday for the given regions over `start_year..=end_year`, ordered by region then date
    pub fn holidays_for(start_year: i32, end_year: i32, regions: &[Region]) -> Vec<PublicHoliday> {
        let mut holidays = Vec::new();
        for year in start_year..=end_year {
            for region in regions {
                holidays.extend(Self::year_holidays(year, *region));
            }
        }
        holidays
    }

    /// The holidays one `(year, region)` pair contributes
    pub fn year_holidays(year: i32, region: Region) -> Vec<PublicHoliday> {
        match region {
            Region::National => Self::national_holidays(year),
            regional => {
                let mut holidays = Vec::new();
                if let Some((month, day, name)) = regional.anniversary_anchor() {
                    let anchor = ymd(year, month, day);
                    holidays.push(PublicHoliday::new(Self::nearest_monday(anchor), name, regional));
                }
                holidays
            },
        }
    }

    fn national_holidays(year: i32) -> Vec<PublicHoliday> {
        let region = Region::National;
        let easter = Self::easter_sunday(year);

        let mut holidays = vec![
            PublicHoliday::new(ymd(year, 1, 1), "New Year's Day", region),
            PublicHoliday::new(ymd(year, 1, 2), "Day after New Year's Day", region),
            PublicHoliday::new(ymd(year, 2, 6), "Waitangi Day", region),
            PublicHoliday::new(easter - Duration::days(2), "Good Friday", region),
            PublicHoliday::new(easter + Duration::days(1), "Easter Monday", region),
            PublicHoliday::new(ymd(year, 4, 25), "ANZAC Day", region),
            PublicHoliday::new(Self::nth_monday(year, 6, 1), "King's Birthday", region),
            PublicHoliday::new(Self::nth_monday(year, 10, 4), "Labour Day", region),
            PublicHoliday::new(ymd(year, 12, 25), "Christmas Day", region),
            PublicHoliday::new(ymd(year, 12, 26), "Boxing Day", region),
        ];

        if let Some(date) = Self::matariki(year) {
            holidays.push(PublicHoliday::new(date, "Matariki", region));
        }

        holidays.sort_by_key(|h| h.date());
        holidays
    }

    /// Easter Sunday for a year, using the anonymous Gregorian computus
    pub fn easter_sunday(year: i32) -> NaiveDate {
        let a = year % 19;
        let b = year / 100;
        let c = year % 100;
        let d = b / 4;
        let e = b % 4;
        let f = (b + 8) / 25;
        let g = (b - f + 1) / 3;
        let h = (19 * a + b - d - g + 15) % 30;
        let i = c / 4;
        let k = c % 4;
        let l = (32 + 2 * e + 2 * i - h - k) % 7;
        let m = (a + 11 * h + 22 * l) / 451;
        let month = (h + l - 7 * m + 114) / 31;
        let day = (h + l - 7 * m + 114) % 31 + 1;
        ymd(year, month as u32, day as u32)
    }

    /// The observed Monday for an anniversary-day anchor: Mon-Thu anchors move back to
    /// the Monday of the same week, Fri-Sun anchors move forward to the following Monday
    pub fn nearest_monday(anchor: NaiveDate) -> NaiveDate {
        let days_past_monday = anchor.weekday().num_days_from_monday() as i64;
        if days_past_monday <= 3 {
            anchor - Duration::days(days_past_monday)
        } else {
            anchor + Duration::days(7 - days_past_monday)
        }
    }

    /// The n-th Monday of a month (1-based)
    pub fn nth_monday(year: i32, month: u32, n: u32) -> NaiveDate {
        let mut date = ymd(year, month, 1);
        while date.weekday() != Weekday::Mon {
            date = date + Duration::days(1);
        }
        date + Duration::days(7 * (n as i64 - 1))
    }

    /// Matariki has no closed-form rule; dates are taken from the officially announced
    /// table. Years outside the table contribute no holiday (a documented gap, not an error)
    pub fn matariki(year: i32) -> Option<NaiveDate> {
        let (month, day) = match year {
            2022 => (6, 24),
            2023 => (7, 14),
            2024 => (6, 28),
            2025 => (6, 20),
            2026 => (7, 10),
            2027 => (6, 25),
            2028 => (7, 14),
            2029 => (7, 6),
            2030 => (6, 21),
            2031 => (7, 11),
            2032 => (7, 2),
            2033 => (6, 24),
            2034 => (7, 7),
            2035 => (6, 29),
            _ => return None,
        };
        Some(ymd(year, month, day))
    }
}

/// Resolve the effective holiday set for a year range, preferring persisted rows.
///
/// For every `(year, region)` pair that has at least one entry in the persisted table,
/// those entries are used verbatim; the computed calendar only fills the pairs the table
/// does not cover. This keeps officially-announced dates authoritative while still
/// working on a freshly-installed portal with an empty holiday table.
pub async fn resolve<H>(
    store: &H,
    start_year: i32,
    end_year: i32,
    regions: &[Region],
) -> Result<HolidaySet, Box<dyn Error>>
where
    H: HolidayStore + ?Sized,
{
    let years: Vec<i32> = (start_year..=end_year).collect();
    let persisted = store.holidays_for_years(&years, regions).await?;

    let mut covered: HashSet<(i32, Region)> = HashSet::new();
    for holiday in &persisted {
        covered.insert((holiday.date().year(), holiday.region()));
    }

    let mut holidays = persisted;
    for year in start_year..=end_year {
        for region in regions {
            if covered.contains(&(year, *region)) {
                log::debug!("Using persisted holidays for {} / {}", year, region);
                continue;
            }
            holidays.extend(HolidayCalendar::year_holidays(year, *region));
        }
    }

    Ok(HolidaySet::from_holidays(holidays))
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("holiday rules only produce valid calendar dates")
}
