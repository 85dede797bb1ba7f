//! Interval algebra over UTC time.
//!
//! This crate contains the fundamental types and logic for:
//! - Periods: half-open `[start, end)` intervals and their relations
//! - Period values: a value holding over a period
//! - Timelines: start-ordered period values, with conflict resolution,
//!   contiguous-run merging and aggregation of two timelines
//!
//! Timelines model piecewise-constant functions of time (budgets, rates,
//! statuses). Two such functions combine through a caller-supplied reduction:
//!
//! ```
//! use tl_core::{Period, Timeline};
//!
//! let mut budget = Timeline::new();
//! budget.add(Period::month(2024, 1)?, 100);
//! budget.add(Period::day(2024, 1, 15)?, 80);
//!
//! let resolved = budget.resolve_conflicts(|_, value, acc| acc + value)?;
//! assert_eq!(resolved.len(), 3);
//! assert_eq!(resolved.items()[1].value, 180);
//! # Ok::<(), tl_core::TimelineError>(())
//! ```

mod builder;
mod error;
mod period;
mod period_value;
mod split;
mod timeline;

pub use builder::TimelineBuilder;
pub use error::{Result, TimelineError};
pub use period::{Period, midnight_utc};
pub use period_value::{PeriodValue, clamp_periods, split_all_periods};
pub use split::{CalendarStep, Split};
pub use timeline::{Timeline, resolve_sorted};
