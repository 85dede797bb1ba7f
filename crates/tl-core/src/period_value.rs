//! Values attached to periods, and helpers over collections of them.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::period::Period;

/// A value holding over a [`Period`].
///
/// The value is opaque to the engine; only caller-supplied reduction or
/// equality functions ever look at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodValue<T> {
    pub period: Period,
    pub value: T,
}

impl<T> PeriodValue<T> {
    /// Attaches `value` to `period` without further checks.
    #[must_use]
    pub const fn new(period: Period, value: T) -> Self {
        Self { period, value }
    }

    /// Validates the bounds and attaches `value`.
    pub fn from_times(start: DateTime<Utc>, end: DateTime<Utc>, value: T) -> Result<Self> {
        Ok(Self::new(Period::new(start, end)?, value))
    }

    /// Returns true if the underlying period is empty.
    pub fn is_empty(&self) -> bool {
        self.period.is_empty()
    }

    /// Restricts the period to `limit`, keeping the value as-is.
    pub fn clamp(&self, limit: &Period) -> Result<Self>
    where
        T: Clone,
    {
        let period = self.period.clamp(limit)?;
        Ok(Self::new(period, self.value.clone()))
    }
}

impl<T: fmt::Display> fmt::Display for PeriodValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.period, self.value)
    }
}

/// Cuts the combined extent of `items` at every distinct boundary instant.
///
/// Every start and end instant becomes a cut point, so each input period is
/// exactly a union of consecutive output periods. The output has one period
/// fewer than there are distinct boundaries, and is empty for empty input.
pub fn split_all_periods<T>(items: &[PeriodValue<T>]) -> Vec<Period> {
    let boundaries: BTreeSet<DateTime<Utc>> = items
        .iter()
        .flat_map(|item| [item.period.start(), item.period.end()])
        .collect();

    boundaries
        .iter()
        .zip(boundaries.iter().skip(1))
        .map(|(start, end)| Period::spanning(*start, *end))
        .collect()
}

/// Clamps every item to `limit`, dropping the ones that fall outside it.
pub fn clamp_periods<T: Clone>(items: &[PeriodValue<T>], limit: &Period) -> Vec<PeriodValue<T>> {
    let clamped: Vec<_> = items
        .iter()
        .filter_map(|item| item.clamp(limit).ok())
        .filter(|item| !item.is_empty())
        .collect();

    if clamped.len() < items.len() {
        tracing::trace!(
            limit = %limit,
            dropped = items.len() - clamped.len(),
            "dropped items outside clamp limit"
        );
    }
    clamped
}
