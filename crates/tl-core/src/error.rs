//! Error type shared by every timeline operation.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::period::Period;

/// Errors raised by period construction, clamping and conflict resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// The end of an interval is not strictly after its start.
    #[error("end {end} must be after start {start}")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A clamp was asked for two periods that do not intersect.
    #[error("period {period} lies outside limit {limit}")]
    NoOverlap { period: Period, limit: Period },

    /// Conflict resolution met an item entirely before the current cluster.
    #[error("timeline is not sorted: {period} comes before {extent}")]
    UnsortedTimeline { period: Period, extent: Period },

    /// A calendar constructor was given a date that does not exist.
    #[error("invalid date {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// Convenience alias for results carrying a [`TimelineError`].
pub type Result<T, E = TimelineError> = std::result::Result<T, E>;
