//! Fluent construction of timelines.

use chrono::{DateTime, Utc};

use crate::error::{Result, TimelineError};
use crate::period::Period;
use crate::period_value::PeriodValue;
use crate::timeline::Timeline;

/// Accumulates period values and produces a sorted [`Timeline`].
///
/// The first invalid input is remembered and every later call is ignored;
/// [`TimelineBuilder::build`] then returns that error.
#[derive(Debug, Clone)]
pub struct TimelineBuilder<T> {
    items: Vec<PeriodValue<T>>,
    error: Option<TimelineError>,
}

impl<T> Default for TimelineBuilder<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
        }
    }
}

impl<T> TimelineBuilder<T> {
    /// Creates a builder with no items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` over `[start, end)`.
    #[must_use]
    pub fn add_period(self, start: DateTime<Utc>, end: DateTime<Utc>, value: T) -> Self {
        self.push_with(|| Period::new(start, end), value)
    }

    /// Adds an existing period value, rejecting empty or inverted periods.
    #[must_use]
    pub fn add_period_value(self, item: PeriodValue<T>) -> Self {
        let PeriodValue { period, value } = item;
        self.push_with(|| Period::new(period.start(), period.end()), value)
    }

    /// Adds `value` over the calendar month `year-month`.
    #[must_use]
    pub fn add_month(self, year: i32, month: u32, value: T) -> Self {
        self.push_with(|| Period::month(year, month), value)
    }

    /// Adds `value` over the calendar day `year-month-day`.
    #[must_use]
    pub fn add_day(self, year: i32, month: u32, day: u32, value: T) -> Self {
        self.push_with(|| Period::day(year, month, day), value)
    }

    /// Returns the latched error, or the collected items sorted by start.
    pub fn build(self) -> Result<Timeline<T>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Timeline::from(self.items))
    }

    fn push_with(mut self, period: impl FnOnce() -> Result<Period>, value: T) -> Self {
        if self.error.is_some() {
            return self;
        }
        match period() {
            Ok(period) => self.items.push(PeriodValue::new(period, value)),
            Err(err) => {
                tracing::debug!(error = %err, "timeline builder rejected period");
                self.error = Some(err);
            }
        }
        self
    }
}
