//! Lazy splitting of a period into consecutive sub-periods.

use std::iter::FusedIterator;

use chrono::{DateTime, Days, Months, Utc};

use crate::period::Period;

/// Step function signature used by the calendar splitters.
pub type CalendarStep = fn(DateTime<Utc>) -> Option<DateTime<Utc>>;

/// Iterator returned by [`Period::split`].
///
/// Each call to `next` applies the step function to the cursor and yields
/// `[cursor, step(cursor))`. Iteration ends once the cursor reaches the end
/// of the source period. The last chunk is *not* clipped: a step that
/// overshoots produces a final period extending past the source end.
///
/// A step returning `None`, or one that fails to move the cursor forward,
/// ends the iteration.
#[derive(Debug, Clone)]
pub struct Split<F> {
    cursor: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    step: F,
}

impl<F> Iterator for Split<F>
where
    F: FnMut(DateTime<Utc>) -> Option<DateTime<Utc>>,
{
    type Item = Period;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor.filter(|c| *c < self.end)?;
        self.cursor = None;

        let Some(next) = (self.step)(current) else {
            tracing::warn!(cursor = %current, "split step overflowed the calendar range");
            return None;
        };
        if next <= current {
            tracing::warn!(cursor = %current, next = %next, "split step did not advance");
            return None;
        }

        self.cursor = Some(next);
        Some(Period::spanning(current, next))
    }
}

impl<F> FusedIterator for Split<F> where F: FnMut(DateTime<Utc>) -> Option<DateTime<Utc>> {}

fn next_day(instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
    instant.checked_add_days(Days::new(1))
}

fn next_month(instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
    instant.checked_add_months(Months::new(1))
}

impl Period {
    /// Splits the period by repeatedly applying `step` to a running cursor.
    ///
    /// The returned iterator is lazy and one-shot; calling `split` again
    /// starts a fresh sequence.
    pub fn split<F>(&self, step: F) -> Split<F>
    where
        F: FnMut(DateTime<Utc>) -> Option<DateTime<Utc>>,
    {
        Split {
            cursor: Some(self.start()),
            end: self.end(),
            step,
        }
    }

    /// Splits the period into calendar days.
    pub fn split_by_days(&self) -> Split<CalendarStep> {
        self.split(next_day as CalendarStep)
    }

    /// Splits the period into calendar months.
    ///
    /// Months are added with end-of-month clamping, so stepping from the 31st
    /// lands on the last day of a shorter month.
    pub fn split_by_months(&self) -> Split<CalendarStep> {
        self.split(next_month as CalendarStep)
    }

    /// Partitions this period around its overlap with `other`.
    ///
    /// Yields, in order, the part before `other` (if any), the overlap, and
    /// the part after `other` (if any). Yields nothing when the periods do not
    /// intersect.
    pub fn split_from_period(&self, other: &Self) -> impl Iterator<Item = Self> + use<> {
        let pieces = if self.intersects(other) {
            [
                (self.start() < other.start()).then(|| Self::spanning(self.start(), other.start())),
                Some(Self::spanning(
                    self.start().max(other.start()),
                    self.end().min(other.end()),
                )),
                (self.end() > other.end()).then(|| Self::spanning(other.end(), self.end())),
            ]
        } else {
            [None; 3]
        };
        pieces.into_iter().flatten()
    }
}
