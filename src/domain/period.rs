use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage format for timestamps. Fixed width with milliseconds, so string
/// comparison in SQL orders the same way as the timestamps themselves.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Today,
    Week,
    Month,
    Year,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Today => "today",
            PeriodKind::Week => "week",
            PeriodKind::Month => "month",
            PeriodKind::Year => "year",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "today" => Some(PeriodKind::Today),
            "week" => Some(PeriodKind::Week),
            "month" => Some(PeriodKind::Month),
            "year" => Some(PeriodKind::Year),
            _ => None,
        }
    }
}

impl std::fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time window relative to "now": the current period when `offset` is 0,
/// the one before it when 1, and so on. `Today` ignores the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub kind: PeriodKind,
    pub offset: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Period {kind} with offset {offset} is outside the supported calendar range")]
    OutOfRange { kind: PeriodKind, offset: u32 },
}

impl Period {
    pub fn new(kind: PeriodKind, offset: u32) -> Self {
        Self { kind, offset }
    }

    pub fn today() -> Self {
        Self::new(PeriodKind::Today, 0)
    }

    pub fn week(offset: u32) -> Self {
        Self::new(PeriodKind::Week, offset)
    }

    pub fn month(offset: u32) -> Self {
        Self::new(PeriodKind::Month, offset)
    }

    pub fn year(offset: u32) -> Self {
        Self::new(PeriodKind::Year, offset)
    }

    /// Resolve to a concrete inclusive range, computed in local wall-clock time.
    pub fn resolve(&self, now: NaiveDateTime) -> Result<DateRange, PeriodError> {
        let out_of_range = || PeriodError::OutOfRange {
            kind: self.kind,
            offset: self.offset,
        };
        let today = now.date();

        let (first, last) = match self.kind {
            PeriodKind::Today => (today, today),
            PeriodKind::Week => {
                let shifted = today
                    .checked_sub_days(Days::new(u64::from(self.offset) * 7))
                    .ok_or_else(out_of_range)?;
                let monday = shifted
                    .checked_sub_days(Days::new(u64::from(
                        shifted.weekday().num_days_from_monday(),
                    )))
                    .ok_or_else(out_of_range)?;
                let sunday = monday
                    .checked_add_days(Days::new(6))
                    .ok_or_else(out_of_range)?;
                (monday, sunday)
            }
            PeriodKind::Month => {
                let first =
                    shift_months(today, i64::from(self.offset)).ok_or_else(out_of_range)?;
                (first, last_day_of_month(first).ok_or_else(out_of_range)?)
            }
            PeriodKind::Year => {
                let year = i32::try_from(i64::from(today.year()) - i64::from(self.offset))
                    .map_err(|_| out_of_range())?;
                (
                    NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(out_of_range)?,
                    NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(out_of_range)?,
                )
            }
        };

        Ok(DateRange {
            start: start_of_day(first),
            end: end_of_day(last).ok_or_else(out_of_range)?,
        })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            PeriodKind::Today => write!(f, "today"),
            _ => write!(f, "{}-{}", self.kind, self.offset),
        }
    }
}

/// Inclusive on both ends: `end` is the last millisecond of the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Number of calendar days covered, counting partial days as whole.
    pub fn inclusive_days(&self) -> i64 {
        let millis = (self.end - self.start).num_milliseconds();
        millis.div_euclid(MILLIS_PER_DAY) + 1
    }

    /// "March 2024" style label for the month containing `start`.
    pub fn month_label(&self) -> String {
        self.start.format("%B %Y").to_string()
    }
}

/// Source of "now". Every service call reads it once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(NaiveDateTime),
}

impl Clock {
    pub fn now(&self) -> NaiveDateTime {
        match self {
            Clock::System => Local::now().naive_local(),
            Clock::Fixed(instant) => *instant,
        }
    }
}

/// Whole calendar months from the month of `then` to the month of `now`.
pub fn months_between(now: NaiveDateTime, then: NaiveDateTime) -> i64 {
    (i64::from(now.year()) - i64::from(then.year())) * 12 + i64::from(now.month())
        - i64::from(then.month())
}

/// Whole calendar years from the year of `then` to the year of `now`.
pub fn years_between(now: NaiveDateTime, then: NaiveDateTime) -> i64 {
    i64::from(now.year()) - i64::from(then.year())
}

pub fn format_timestamp(instant: NaiveDateTime) -> String {
    instant.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn end_of_day(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_milli_opt(23, 59, 59, 999)
}

/// First day of the month `months` before the month of `date`.
fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let index = i64::from(date.year()) * 12 + i64::from(date.month0()) - months;
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    shift_months(first, -1)?.pred_opt()
}
