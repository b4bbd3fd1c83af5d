use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::BillingError;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// A calendar month being billed.
///
/// Windows are half-open: `[start, end)` where `end` is the first day of the
/// following month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    start: NaiveDate,
}

impl BillingPeriod {
    pub fn new(month: u32, year: i32) -> Result<Self, BillingError> {
        if !(1..=12).contains(&month) {
            return Err(BillingError::InvalidPeriod(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(BillingError::InvalidPeriod(format!(
                "year must be between {} and {}, got {}",
                MIN_YEAR, MAX_YEAR, year
            )));
        }

        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            BillingError::InvalidPeriod(format!("{}/{} is not a valid month", month, year))
        })?;

        Ok(Self { start })
    }

    /// The period containing `date`.
    pub fn containing(date: NaiveDate) -> Result<Self, BillingError> {
        Self::new(date.month(), date.year())
    }

    pub fn month(&self) -> u32 {
        self.start.month()
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    /// First day of the month.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day of the following month (exclusive bound).
    pub fn end(&self) -> NaiveDate {
        self.start + Months::new(1)
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Months::new(1),
        }
    }

    /// Midnight UTC on the first day of the month.
    pub fn start_instant(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.start.and_time(NaiveTime::MIN))
    }

    /// Day `due_day` of the following month. `due_day` is clamped to 1..=28 so
    /// every month has it.
    pub fn due_date(&self, due_day: u32) -> NaiveDate {
        let offset = u64::from(due_day.clamp(1, 28) - 1);
        self.end() + Days::new(offset)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date < self.end()
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month(), self.year())
    }
}
