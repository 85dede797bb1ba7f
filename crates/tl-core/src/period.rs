//! Half-open time intervals and their relations.
//!
//! A [`Period`] covers `[start, end)`: the start instant belongs to the period,
//! the end instant does not. Two adjacent periods therefore share a boundary
//! without overlapping, which is what lets a set of periods be cut into
//! atomic pieces (see [`crate::split_all_periods`]).
//!
//! # Point membership vs. interval overlap
//!
//! [`Period::contains`] tests a single instant and is inclusive on *both*
//! ends, while [`Period::intersects`] treats periods as half-open and does not
//! count a shared boundary as overlap. The two answer different questions and
//! are kept deliberately distinct.

use std::fmt;

use chrono::{DateTime, Days, Months, NaiveDate, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};

/// A half-open time interval `[start, end)`.
///
/// Valid periods always have `end > start`. The only exception is the
/// [`Period::empty`] sentinel, which some operations return to mean "no
/// interval".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Unvalidated wire shape of a [`Period`].
#[derive(Deserialize)]
struct RawPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawPeriod> for Period {
    type Error = TimelineError;

    fn try_from(raw: RawPeriod) -> Result<Self> {
        let empty = Self::empty();
        if raw.start == empty.start && raw.end == empty.end {
            return Ok(empty);
        }
        Self::new(raw.start, raw.end)
    }
}

impl Period {
    /// Creates a period after checking that `end` is strictly after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(TimelineError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// The empty sentinel: both bounds at the Unix epoch.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            start: DateTime::<Utc>::UNIX_EPOCH,
            end: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Builds a period from bounds the caller already knows to be ordered.
    pub(crate) const fn spanning(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The calendar day `year-month-day` in UTC.
    pub fn day(year: i32, month: u32, day: u32) -> Result<Self> {
        let start = midnight_utc(year, month, day)?;
        let end = start
            .checked_add_days(Days::new(1))
            .ok_or(TimelineError::InvalidDate { year, month, day })?;
        Self::new(start, end)
    }

    /// The calendar month `year-month` in UTC, from the 1st to the 1st of the
    /// following month.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = midnight_utc(year, month, 1)?;
        let end = start
            .checked_add_months(Months::new(1))
            .ok_or(TimelineError::InvalidDate { year, month, day: 1 })?;
        Self::new(start, end)
    }

    /// The calendar year in UTC, from January 1st to January 1st.
    pub fn year(year: i32) -> Result<Self> {
        let start = midnight_utc(year, 1, 1)?;
        let end = start
            .checked_add_months(Months::new(12))
            .ok_or(TimelineError::InvalidDate {
                year,
                month: 1,
                day: 1,
            })?;
        Self::new(start, end)
    }

    /// Inclusive start instant.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end instant.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the period.
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Returns true if `instant` lies within `[start, end]`.
    ///
    /// Unlike the rest of the interval algebra this check includes the end
    /// instant.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Returns true if `other` is fully nested inside this period.
    pub fn contains_period(&self, other: &Self) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Returns true if the two periods share at least one instant.
    ///
    /// Periods that merely touch at a boundary do not intersect.
    pub fn intersects(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Returns true if this period ends at or before `other` starts.
    pub fn before(&self, other: &Self) -> bool {
        self.end <= other.start
    }

    /// Returns true if this period starts at or after `other` ends.
    pub fn after(&self, other: &Self) -> bool {
        self.start >= other.end
    }

    /// Returns true if the periods are adjacent with neither gap nor overlap.
    pub fn is_contiguous(&self, other: &Self) -> bool {
        self.end == other.start || self.start == other.end
    }

    /// Returns true for zero-length (and inverted) periods.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Restricts this period to `limit`.
    ///
    /// Fails with [`TimelineError::NoOverlap`] when the two periods do not
    /// intersect; a disjoint limit never yields a degenerate empty period.
    pub fn clamp(&self, limit: &Self) -> Result<Self> {
        if !self.intersects(limit) {
            return Err(TimelineError::NoOverlap {
                period: *self,
                limit: *limit,
            });
        }
        Self::new(self.start.max(limit.start), self.end.min(limit.end))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Midnight UTC at the start of the given calendar date.
pub fn midnight_utc(year: i32, month: u32, day: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(TimelineError::InvalidDate { year, month, day })
}
