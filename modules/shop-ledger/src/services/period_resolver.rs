//! Period Resolver
//!
//! Translates named presets ("today", "lastMonth", ...) into concrete date
//! intervals, and buckets timestamps by period granularity. Both use the same
//! start-of-day / week / month / year helpers, so a "thisWeek" preset and a
//! weekly report bucket always agree on where a week begins.
//!
//! Weeks start on Sunday. Interval ends are inclusive: closed periods end at
//! 23:59:59.999 of their last day, and "this*" presets end at the reference
//! instant so a mid-month report never reaches into the future.

use chrono::{Datelike, Days, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LedgerError, LedgerResult};

/// Earliest calendar year a report window may touch
pub const MIN_REPORT_YEAR: i32 = 1900;
/// Latest calendar year a report window may touch
pub const MAX_REPORT_YEAR: i32 = 9999;
/// Most trend buckets a single report window may span
pub const MAX_BUCKETS: usize = 10_000;

/// Named reporting period relative to a reference instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PeriodPreset {
    Today,
    Yesterday,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    ThisYear,
    LastYear,
}

impl PeriodPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodPreset::Today => "today",
            PeriodPreset::Yesterday => "yesterday",
            PeriodPreset::ThisWeek => "thisWeek",
            PeriodPreset::LastWeek => "lastWeek",
            PeriodPreset::ThisMonth => "thisMonth",
            PeriodPreset::LastMonth => "lastMonth",
            PeriodPreset::ThisYear => "thisYear",
            PeriodPreset::LastYear => "lastYear",
        }
    }
}

impl fmt::Display for PeriodPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodPreset {
    type Err = LedgerError;

    /// Accepts camelCase, snake_case, and kebab-case spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "today" => Ok(PeriodPreset::Today),
            "yesterday" => Ok(PeriodPreset::Yesterday),
            "thisweek" => Ok(PeriodPreset::ThisWeek),
            "lastweek" => Ok(PeriodPreset::LastWeek),
            "thismonth" => Ok(PeriodPreset::ThisMonth),
            "lastmonth" => Ok(PeriodPreset::LastMonth),
            "thisyear" => Ok(PeriodPreset::ThisYear),
            "lastyear" => Ok(PeriodPreset::LastYear),
            _ => Err(LedgerError::InvalidArgument(format!(
                "unknown period preset: {}",
                s
            ))),
        }
    }
}

/// Inclusive `[start, end]` interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> LedgerResult<Self> {
        if start > end {
            return Err(LedgerError::InvalidArgument(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Interval of equal length ending one millisecond before this one starts
    pub fn previous(&self) -> LedgerResult<DateRange> {
        let length = self.end.signed_duration_since(self.start);
        let end = self.start.checked_sub_signed(Duration::milliseconds(1));
        match end.and_then(|end| end.checked_sub_signed(length).map(|start| (start, end))) {
            Some((start, end)) => Ok(DateRange { start, end }),
            None => Err(LedgerError::InvalidArgument(format!(
                "no representable period precedes {}",
                self.start
            ))),
        }
    }

    /// Reject windows outside the supported calendar years
    pub fn ensure_reportable(&self) -> LedgerResult<()> {
        for bound in [self.start, self.end] {
            if !(MIN_REPORT_YEAR..=MAX_REPORT_YEAR).contains(&bound.year()) {
                return Err(LedgerError::InvalidArgument(format!(
                    "date {} is outside the supported years {}-{}",
                    bound, MIN_REPORT_YEAR, MAX_REPORT_YEAR
                )));
            }
        }
        Ok(())
    }
}

/// Resolve a preset name against an explicit reference instant, or the local
/// wall clock when none is given
pub fn resolve(preset: &str, reference: Option<NaiveDateTime>) -> LedgerResult<DateRange> {
    let preset: PeriodPreset = preset.parse()?;
    let reference = reference.unwrap_or_else(|| Local::now().naive_local());
    Ok(resolve_preset(preset, reference))
}

pub fn resolve_preset(preset: PeriodPreset, reference: NaiveDateTime) -> DateRange {
    let today = reference.date();

    let (start, end) = match preset {
        PeriodPreset::Today => (start_of_day(today), end_of_day(today)),
        PeriodPreset::Yesterday => {
            let day = today - Days::new(1);
            (start_of_day(day), end_of_day(day))
        }
        PeriodPreset::ThisWeek => (start_of_day(start_of_week(today)), reference),
        PeriodPreset::LastWeek => {
            let this_week = start_of_week(today);
            (
                start_of_day(this_week - Days::new(7)),
                end_of_day(this_week - Days::new(1)),
            )
        }
        PeriodPreset::ThisMonth => (start_of_day(start_of_month(today)), reference),
        PeriodPreset::LastMonth => {
            let this_month = start_of_month(today);
            let last_month = this_month - Months::new(1);
            (start_of_day(last_month), end_of_day(this_month - Days::new(1)))
        }
        PeriodPreset::ThisYear => (start_of_day(start_of_year(today)), reference),
        PeriodPreset::LastYear => {
            let this_year = start_of_year(today);
            let last_year = this_year - Months::new(12);
            (start_of_day(last_year), end_of_day(this_year - Days::new(1)))
        }
    };

    DateRange { start, end }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

/// 23:59:59.999 of the given day
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| start_of_day(date))
}

/// Sunday on or before `date`
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_sunday()))
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn start_of_year(date: NaiveDate) -> NaiveDate {
    date.with_ordinal(1).unwrap_or(date)
}

/// Bucket size for grouped and trend reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "daily",
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Yearly => "yearly",
        }
    }

    /// First day of the bucket containing `date`
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => date,
            Granularity::Weekly => start_of_week(date),
            Granularity::Monthly => start_of_month(date),
            Granularity::Yearly => start_of_year(date),
        }
    }

    /// First day of the bucket after the one starting at `bucket_start`
    pub fn next_bucket(&self, bucket_start: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => bucket_start + Days::new(1),
            Granularity::Weekly => bucket_start + Days::new(7),
            Granularity::Monthly => bucket_start + Months::new(1),
            Granularity::Yearly => bucket_start + Months::new(12),
        }
    }

    /// Display key for a bucket: `2024-03-15`, `2024-03-10` (week start),
    /// `2024-03`, or `2024`
    pub fn label(&self, bucket_start: NaiveDate) -> String {
        match self {
            Granularity::Daily | Granularity::Weekly => bucket_start.format("%Y-%m-%d").to_string(),
            Granularity::Monthly => bucket_start.format("%Y-%m").to_string(),
            Granularity::Yearly => bucket_start.format("%Y").to_string(),
        }
    }

    /// Number of buckets `buckets` would return, without building them
    pub fn bucket_count(&self, range: &DateRange) -> usize {
        let first = self.bucket_start(range.start.date());
        let last = self.bucket_start(range.end.date());
        let steps = match self {
            Granularity::Daily => last.signed_duration_since(first).num_days(),
            Granularity::Weekly => last.signed_duration_since(first).num_days() / 7,
            Granularity::Monthly => {
                i64::from(last.year() - first.year()) * 12 + i64::from(last.month())
                    - i64::from(first.month())
            }
            Granularity::Yearly => i64::from(last.year() - first.year()),
        };
        usize::try_from(steps + 1).unwrap_or(0)
    }

    /// Every bucket start overlapping `range`, in order
    pub fn buckets(&self, range: &DateRange) -> Vec<NaiveDate> {
        let last = self.bucket_start(range.end.date());
        let mut current = self.bucket_start(range.start.date());
        let mut buckets = Vec::new();
        while current <= last {
            buckets.push(current);
            current = self.next_bucket(current);
        }
        buckets
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Granularity::Daily),
            "weekly" | "week" => Ok(Granularity::Weekly),
            "monthly" | "month" => Ok(Granularity::Monthly),
            "yearly" | "year" => Ok(Granularity::Yearly),
            other => Err(LedgerError::InvalidArgument(format!(
                "unknown period granularity: {}",
                other
            ))),
        }
    }
}
