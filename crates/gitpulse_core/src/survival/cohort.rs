//! Calendar quarters and sampling schedules.

use std::fmt;

use chrono::{DateTime, Datelike as _, NaiveDate, TimeDelta, Utc};

const MONTHS_PER_QUARTER: u32 = 3;

/// A calendar quarter such as `2024-Q1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quarter {
    year: i32,
    /// 1 through 4.
    number: u32,
}

impl Quarter {
    /// The quarter containing `time`.
    #[must_use]
    pub fn containing(time: DateTime<Utc>) -> Self {
        Self {
            year: time.year(),
            number: time.month0() / MONTHS_PER_QUARTER + 1,
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Quarter number, 1 through 4.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.number
    }

    /// Inclusive start of the quarter.
    #[must_use]
    pub fn start(self) -> DateTime<Utc> {
        first_of_month(self.year, (self.number - 1) * MONTHS_PER_QUARTER + 1)
    }

    /// Exclusive end of the quarter, the start of the next one.
    #[must_use]
    pub fn end(self) -> DateTime<Utc> {
        self.next().start()
    }

    /// Returns `true` if `time` falls within `[start, end)`.
    #[must_use]
    pub fn contains(self, time: DateTime<Utc>) -> bool {
        Self::containing(time) == self
    }

    /// The following quarter.
    #[must_use]
    pub const fn next(self) -> Self {
        if self.number == 4 {
            Self {
                year: self.year + 1,
                number: 1,
            }
        } else {
            Self {
                year: self.year,
                number: self.number + 1,
            }
        }
    }

    /// The preceding quarter.
    #[must_use]
    pub const fn prev(self) -> Self {
        if self.number == 1 {
            Self {
                year: self.year - 1,
                number: 4,
            }
        } else {
            Self {
                year: self.year,
                number: self.number - 1,
            }
        }
    }

    /// Label such as `2024-Q1`.
    #[must_use]
    pub fn label(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.number)
    }
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(DateTime::<Utc>::MIN_UTC, |dt| dt.and_utc())
}

/// The consecutive quarters from `first` through `last`, keeping only the
/// most recent `max` of them, oldest first.
#[must_use]
pub fn cohort_quarters(first: Quarter, last: Quarter, max: usize) -> Vec<Quarter> {
    let mut quarters = Vec::new();
    let mut current = last;

    while quarters.len() < max && current >= first {
        quarters.push(current);
        current = current.prev();
    }

    quarters.reverse();
    quarters
}

/// One scheduled measurement of a cohort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePoint {
    /// Weeks after the cohort end.
    pub weeks_elapsed: u32,
    /// Moment at which the codebase is inspected.
    pub at: DateTime<Utc>,
}

/// Sampling times for a cohort ending at `cohort_end` (exclusive).
///
/// The first sample (week 0) is taken at the last second of the cohort, or
/// at `now` for a quarter still in progress, so a commit made on the first
/// instant of the next quarter is not part of it. Later samples follow every
/// `interval_weeks` after `cohort_end` while they are not after `now` and
/// within `horizon_weeks`.
#[must_use]
pub fn sample_schedule(
    cohort_end: DateTime<Utc>,
    now: DateTime<Utc>,
    interval_weeks: u32,
    horizon_weeks: Option<u32>,
) -> Vec<SamplePoint> {
    let mut samples = vec![SamplePoint {
        weeks_elapsed: 0,
        at: (cohort_end - TimeDelta::seconds(1)).min(now),
    }];

    if interval_weeks == 0 {
        return samples;
    }

    let mut weeks = interval_weeks;
    while horizon_weeks.is_none_or(|h| weeks <= h) {
        let at = cohort_end + TimeDelta::weeks(i64::from(weeks));
        if at > now {
            break;
        }
        samples.push(SamplePoint { weeks_elapsed: weeks, at });
        weeks += interval_weeks;
    }

    samples
}
