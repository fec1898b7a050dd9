//! Reporting windows for KPIs and OKRs.
//!
//! A [`Timeframe`] is a period length plus an anchor date. It resolves to an
//! inclusive range of whole days, and it belongs to a *bucket*: the period
//! together with the anchor floored to the start of its week (Sunday), month
//! or quarter. Goals created with any anchor inside a bucket are listed when
//! the performance view shows that bucket.
//!
//! Dates are calendar dates (`NaiveDate`), never instants, so parsing
//! `YYYY-MM-DD` cannot drift across a timezone boundary.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    pub period: Period,
    /// Anchor date. Usually the first day of the bucket, but any day is accepted.
    pub date: NaiveDate,
}

/// Resolved window: `start` at midnight of the first day, `end` at
/// 23:59:59.999 of the last day, so date comparisons include the whole last day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeframeRange {
    /// Inclusive range covering whole days `first..=last`.
    pub fn from_days(first: NaiveDate, last: NaiveDate) -> Self {
        TimeframeRange {
            start: first.and_time(NaiveTime::MIN),
            end: last.and_time(end_of_day()),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.date()
    }

    /// Whether a calendar date (taken at midnight) falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        let at = date.and_time(NaiveTime::MIN);
        self.start <= at && at <= self.end
    }

    /// Strict overlap test between two windows.
    pub fn overlaps(&self, other: &TimeframeRange) -> bool {
        self.start < other.end && self.end > other.start
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).expect("23:59:59.999 is a valid time")
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month `months - 1` months after the one containing `date`.
fn last_day_after(date: NaiveDate, months: u32) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(months))
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Floor a date to the first day of its week (Sunday), month or quarter.
pub fn normalized_start(date: NaiveDate, period: Period) -> NaiveDate {
    match period {
        Period::Week => date - Duration::days(date.weekday().num_days_from_sunday() as i64),
        Period::Month => first_of_month(date),
        Period::Quarter => {
            let first_month = (date.month0() / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), first_month, 1).unwrap_or(date)
        }
    }
}

/// Resolve a timeframe to its inclusive window.
///
/// The window starts at the anchor itself. A week spans seven days, a month
/// ends on the last day of the anchor's month, and a quarter ends on the last
/// day of the second month after the anchor's.
pub fn resolve_range(timeframe: &Timeframe) -> TimeframeRange {
    let start = timeframe.date;
    let last = match timeframe.period {
        Period::Week => start + Duration::days(6),
        Period::Month => last_day_after(start, 1),
        Period::Quarter => last_day_after(start, 3),
    };
    TimeframeRange::from_days(start, last)
}

/// Two timeframes share a bucket when the periods agree and both anchors floor
/// to the same start date.
pub fn same_bucket(a: &Timeframe, b: &Timeframe) -> bool {
    a.period == b.period && normalized_start(a.date, a.period) == normalized_start(b.date, b.period)
}

impl Timeframe {
    pub fn new(period: Period, date: NaiveDate) -> Self {
        Timeframe { period, date }
    }

    /// Canonical timeframe for the bucket containing `date`.
    pub fn bucket_of(period: Period, date: NaiveDate) -> Self {
        Timeframe { period, date: normalized_start(date, period) }
    }

    pub fn range(&self) -> TimeframeRange {
        resolve_range(self)
    }

    /// Move the anchor by `steps` whole periods (negative goes back). A shift
    /// past the representable calendar keeps the current anchor.
    pub fn shifted(&self, steps: i32) -> Self {
        let date = match self.period {
            Period::Week => Duration::try_days(7 * i64::from(steps))
                .and_then(|d| self.date.checked_add_signed(d))
                .unwrap_or(self.date),
            Period::Month => add_months(self.date, steps),
            Period::Quarter => steps.checked_mul(3).map_or(self.date, |m| add_months(self.date, m)),
        };
        Timeframe { period: self.period, date }
    }

    /// Switch period, re-anchoring on the start of the new bucket.
    pub fn with_period(&self, period: Period) -> Self {
        Timeframe::bucket_of(period, self.date)
    }
}

fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months.unsigned_abs()))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Localized `d/m/yyyy` rendering used across the product.
pub fn format_date_vi(date: NaiveDate) -> String {
    date.format("%-d/%-m/%Y").to_string()
}

/// Human label for a timeframe ("Tháng 10, 2025", "Quý 4, 2025", ...).
pub fn format_timeframe(timeframe: &Timeframe) -> String {
    let range = resolve_range(timeframe);
    let start = range.first_day();
    match timeframe.period {
        Period::Week => format!(
            "Tuần {} - {}",
            format_date_vi(start),
            format_date_vi(range.last_day())
        ),
        Period::Month => format!("Tháng {}, {}", start.month(), start.year()),
        Period::Quarter => format!("Quý {}, {}", start.month0() / 3 + 1, start.year()),
    }
}
