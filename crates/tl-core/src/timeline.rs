//! Start-ordered collections of period values and their reconciliation.
//!
//! # Algorithm Summary
//!
//! Conflict resolution is a sweep over items sorted by start:
//!
//! 1. Items are grouped into clusters: a cluster grows while the next item
//!    overlaps the cluster's extent (start of its first item to the latest
//!    end seen so far).
//! 2. When an item starts at or after the extent's end, the cluster is
//!    flushed: it is cut into atomic periods at every boundary, and each
//!    atomic period receives the fold of every cluster value covering it.
//! 3. The last cluster is flushed after the sweep.
//!
//! Only the current cluster is held in memory, so the cost is the sort plus
//! O(k²) per cluster of k items.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimelineError};
use crate::period::Period;
use crate::period_value::{PeriodValue, clamp_periods, split_all_periods};

/// An ordered sequence of [`PeriodValue`]s, sorted by period start.
///
/// Items may overlap; [`Timeline::resolve_conflicts`] turns an overlapping
/// timeline into a canonical one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timeline<T> {
    items: Vec<PeriodValue<T>>,
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Timeline<T> {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, keeping items ordered by start.
    ///
    /// Overlaps are accepted as-is. Among items with the same start, the new
    /// one goes last.
    pub fn add(&mut self, period: Period, value: T) {
        let at = self
            .items
            .partition_point(|item| item.period.start() <= period.start());
        self.items.insert(at, PeriodValue::new(period, value));
    }

    /// All items, in start order.
    pub fn items(&self) -> &[PeriodValue<T>] {
        &self.items
    }

    /// Iterates over the items in start order.
    pub fn iter(&self) -> std::slice::Iter<'_, PeriodValue<T>> {
        self.items.iter()
    }

    /// Number of items, overlapping or not.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the timeline holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose period intersects `period`.
    ///
    /// The scan stops at the first item starting after `period` ends.
    pub fn find_intersects<'a>(
        &'a self,
        period: &Period,
    ) -> impl Iterator<Item = &'a PeriodValue<T>> + use<'a, T> {
        let query = *period;
        self.items
            .iter()
            .take_while(move |item| item.period.start() <= query.end())
            .filter(move |item| item.period.intersects(&query))
    }

    /// Merges contiguous neighbours whose values are equal under `eq`.
    ///
    /// Meant for a timeline without overlaps, typically the output of
    /// [`Timeline::resolve_conflicts`]. The result has the fewest items that
    /// describe the same piecewise-constant function.
    pub fn optimize<F>(&self, mut eq: F) -> Self
    where
        T: Clone,
        F: FnMut(&T, &T) -> bool,
    {
        let mut merged: Vec<PeriodValue<T>> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            if let Some(last) = merged.last_mut() {
                if item.period.is_contiguous(&last.period) && eq(&last.value, &item.value) {
                    last.period = Period::spanning(last.period.start(), item.period.end());
                    continue;
                }
            }
            merged.push(item.clone());
        }

        tracing::debug!(
            items = self.items.len(),
            merged = merged.len(),
            "optimized timeline"
        );
        Self { items: merged }
    }

    /// Resolves overlaps, folding values with `reduce` from `T::default()`.
    ///
    /// `reduce(atomic_period, value, accumulator)` is applied left to right
    /// over every item covering an atomic period. The first call receives
    /// `T::default()` as the accumulator, so the result is only meaningful
    /// when `reduce(p, x, T::default()) == x`, as with addition over numbers.
    /// Use [`Timeline::resolve_conflicts_from`] to supply another identity.
    pub fn resolve_conflicts<F>(&self, reduce: F) -> Result<Self>
    where
        T: Clone + Default,
        F: FnMut(&Period, &T, T) -> T,
    {
        self.resolve_conflicts_from(T::default(), reduce)
    }

    /// Resolves overlaps, folding values with `reduce` starting from `identity`.
    ///
    /// Fails with [`TimelineError::UnsortedTimeline`] if the items are not in
    /// start order; no partial result is returned.
    pub fn resolve_conflicts_from<F>(&self, identity: T, reduce: F) -> Result<Self>
    where
        T: Clone,
        F: FnMut(&Period, &T, T) -> T,
    {
        let items = resolve_sorted(&self.items, &identity, reduce)?;
        tracing::debug!(
            items = self.items.len(),
            resolved = items.len(),
            "resolved timeline conflicts"
        );
        Ok(Self { items })
    }

    /// Combines two timelines into one, folding overlapping values from
    /// `T::default()`.
    ///
    /// See [`Timeline::resolve_conflicts`] for the identity caveat.
    pub fn aggregate<F>(&self, other: &Self, reduce: F) -> Result<Self>
    where
        T: Clone + Default,
        F: FnMut(&Period, &T, T) -> T,
    {
        self.aggregate_from(other, T::default(), reduce)
    }

    /// Combines two timelines into one, folding overlapping values from
    /// `identity`.
    ///
    /// An empty side returns the other side unchanged, without resolving it.
    pub fn aggregate_from<F>(&self, other: &Self, identity: T, reduce: F) -> Result<Self>
    where
        T: Clone,
        F: FnMut(&Period, &T, T) -> T,
    {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }

        let combined: Self = self.iter().chain(other.iter()).cloned().collect();
        tracing::debug!(
            left = self.len(),
            right = other.len(),
            "aggregating timelines"
        );
        combined.resolve_conflicts_from(identity, reduce)
    }
}

/// Resolves overlaps in `items`, which must already be sorted by start.
///
/// This is the sweep behind [`Timeline::resolve_conflicts`], exposed for
/// callers holding a plain slice. An item that starts before the cluster it
/// is compared against is reported as [`TimelineError::UnsortedTimeline`].
pub fn resolve_sorted<T, F>(
    items: &[PeriodValue<T>],
    identity: &T,
    mut reduce: F,
) -> Result<Vec<PeriodValue<T>>>
where
    T: Clone,
    F: FnMut(&Period, &T, T) -> T,
{
    let Some((first, rest)) = items.split_first() else {
        return Ok(Vec::new());
    };

    let mut resolved = Vec::with_capacity(items.len());
    let mut extent = first.period;
    let mut cluster = vec![first.clone()];

    for item in rest {
        // Also catches items lying entirely before the extent
        if item.period.start() < extent.start() {
            return Err(TimelineError::UnsortedTimeline {
                period: item.period,
                extent,
            });
        }

        if item.period.after(&extent) {
            flush_cluster(&cluster, identity, &mut reduce, &mut resolved);
            extent = item.period;
            cluster = clamp_periods(&cluster, &extent);
            cluster.push(item.clone());
            continue;
        }

        extent = Period::spanning(extent.start(), extent.end().max(item.period.end()));
        cluster.push(item.clone());
    }

    flush_cluster(&cluster, identity, &mut reduce, &mut resolved);
    Ok(resolved)
}

/// Emits one item per atomic period of `cluster`, carrying the fold of every
/// cluster value that covers it.
fn flush_cluster<T, F>(
    cluster: &[PeriodValue<T>],
    identity: &T,
    reduce: &mut F,
    out: &mut Vec<PeriodValue<T>>,
) where
    T: Clone,
    F: FnMut(&Period, &T, T) -> T,
{
    let atoms = split_all_periods(cluster);
    tracing::trace!(
        items = cluster.len(),
        atoms = atoms.len(),
        "flushing overlapping cluster"
    );

    for atom in atoms {
        let value = cluster
            .iter()
            .filter(|candidate| candidate.period.intersects(&atom))
            .fold(identity.clone(), |acc, candidate| {
                reduce(&atom, &candidate.value, acc)
            });
        out.push(PeriodValue::new(atom, value));
    }
}

impl<T> From<Vec<PeriodValue<T>>> for Timeline<T> {
    /// Sorts the items by start, keeping the relative order of equal starts.
    fn from(mut items: Vec<PeriodValue<T>>) -> Self {
        items.sort_by_key(|item| item.period.start());
        Self { items }
    }
}

impl<T> FromIterator<PeriodValue<T>> for Timeline<T> {
    fn from_iter<I: IntoIterator<Item = PeriodValue<T>>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> IntoIterator for Timeline<T> {
    type Item = PeriodValue<T>;
    type IntoIter = std::vec::IntoIter<PeriodValue<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Timeline<T> {
    type Item = &'a PeriodValue<T>;
    type IntoIter = std::slice::Iter<'a, PeriodValue<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Display> fmt::Display for Timeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        Ok(())
    }
}

impl<T: Serialize> Serialize for Timeline<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Timeline<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let items = Vec::<PeriodValue<T>>::deserialize(deserializer)?;
        // Restore start order for data produced elsewhere
        Ok(Self::from(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};
    use insta::assert_snapshot;

    use crate::period::midnight_utc;

    fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        midnight_utc(year, month, day).unwrap()
    }

    fn month(year: i32, month: u32) -> Period {
        Period::month(year, month).unwrap()
    }

    fn pv(start: DateTime<Utc>, end: DateTime<Utc>, value: i64) -> PeriodValue<i64> {
        PeriodValue::from_times(start, end, value).unwrap()
    }

    fn sum(_: &Period, value: &i64, acc: i64) -> i64 {
        acc + value
    }

    fn quarter() -> Timeline<i64> {
        let mut timeline = Timeline::new();
        timeline.add(month(2024, 1), 123);
        timeline.add(month(2024, 2), 456);
        timeline.add(month(2024, 3), 69);
        timeline.add(month(2024, 4), 987);
        timeline
    }

    #[test]
    fn add_keeps_start_order() {
        let mut timeline = Timeline::new();
        timeline.add(month(2024, 2), 1200.0);
        timeline.add(month(2024, 1), 1000.0);
        timeline.add(Period::new(date(2024, 1, 15), date(2024, 2, 5)).unwrap(), 900.0);

        let starts: Vec<_> = timeline.iter().map(|i| i.period.start()).collect();
        assert_eq!(starts, vec![date(2024, 1, 1), date(2024, 1, 15), date(2024, 2, 1)]);
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn add_places_equal_starts_after_existing() {
        let mut timeline = Timeline::new();
        timeline.add(month(2024, 1), "first");
        timeline.add(Period::day(2024, 1, 1).unwrap(), "second");
        assert_eq!(timeline.items()[0].value, "first");
        assert_eq!(timeline.items()[1].value, "second");
    }

    #[test]
    fn find_intersects_single_month() {
        let timeline = quarter();
        let found: Vec<_> = timeline
            .find_intersects(&Period::day(2024, 2, 5).unwrap())
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].period, month(2024, 2));
    }

    #[test]
    fn find_intersects_spanning_query() {
        let timeline = quarter();
        let query = Period::new(date(2024, 2, 15), date(2024, 3, 20)).unwrap();
        let found: Vec<_> = timeline
            .find_intersects(&query)
            .map(|i| i.value)
            .collect();
        assert_eq!(found, vec![456, 69]);
    }

    #[test]
    fn find_intersects_skips_item_starting_at_query_end() {
        let mut timeline = Timeline::new();
        timeline.add(month(2024, 1), 1);
        timeline.add(Period::new(date(2024, 1, 10), date(2024, 1, 20)).unwrap(), 2);
        timeline.add(Period::day(2024, 1, 20).unwrap(), 3);
        timeline.add(Period::day(2024, 1, 25).unwrap(), 4);

        let query = Period::new(date(2024, 1, 15), date(2024, 1, 20)).unwrap();
        let found: Vec<_> = timeline
            .find_intersects(&query)
            .map(|i| i.value)
            .collect();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn find_intersects_outside_range() {
        let timeline = quarter();
        assert_eq!(
            timeline
                .find_intersects(&Period::day(2024, 7, 14).unwrap())
                .count(),
            0
        );
    }

    #[test]
    fn resolve_conflicts_slices_overlaps() {
        let timeline: Timeline<i64> = vec![
            PeriodValue::new(month(2024, 1), 100),
            PeriodValue::new(month(2024, 2), 200),
            PeriodValue::new(month(2024, 3), 300),
            pv(date(2024, 1, 10), date(2024, 1, 17), 80),
            pv(date(2024, 1, 12), date(2024, 1, 15), 50),
        ]
        .into();

        let resolved = timeline.resolve_conflicts(sum).unwrap();
        assert_snapshot!(resolved, @r"
        [2024-01-01T00:00:00Z, 2024-01-10T00:00:00Z) 100
        [2024-01-10T00:00:00Z, 2024-01-12T00:00:00Z) 180
        [2024-01-12T00:00:00Z, 2024-01-15T00:00:00Z) 230
        [2024-01-15T00:00:00Z, 2024-01-17T00:00:00Z) 180
        [2024-01-17T00:00:00Z, 2024-02-01T00:00:00Z) 100
        [2024-02-01T00:00:00Z, 2024-03-01T00:00:00Z) 200
        [2024-03-01T00:00:00Z, 2024-04-01T00:00:00Z) 300
        ");
    }

    #[test]
    fn resolve_conflicts_on_disjoint_timeline_is_identity() {
        let mut timeline = Timeline::new();
        timeline.add(month(2024, 1), 100);
        timeline.add(month(2024, 2), 200);
        timeline.add(month(2024, 5), 500);

        assert_eq!(timeline.resolve_conflicts(sum).unwrap(), timeline);
    }

    #[test]
    fn resolve_conflicts_of_empty_timeline_is_empty() {
        let timeline: Timeline<i64> = Timeline::new();
        assert!(timeline.resolve_conflicts(sum).unwrap().is_empty());
    }

    #[test]
    fn resolve_conflicts_passes_atomic_period_to_reducer() {
        let mut timeline = Timeline::new();
        timeline.add(month(2024, 1), 1);
        timeline.add(Period::day(2024, 1, 31).unwrap(), 1);

        let mut seen = Vec::new();
        let resolved = timeline
            .resolve_conflicts(|period, value, acc| {
                seen.push(*period);
                acc + value
            })
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(
            seen,
            vec![
                Period::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap(),
                Period::day(2024, 1, 31).unwrap(),
                Period::day(2024, 1, 31).unwrap(),
            ]
        );
    }

    #[test]
    fn resolve_conflicts_from_uses_explicit_identity() {
        let mut timeline = Timeline::new();
        timeline.add(month(2024, 1), 3);
        timeline.add(Period::day(2024, 1, 10).unwrap(), 4);

        let product = timeline
            .resolve_conflicts_from(1, |_, value, acc| acc * value)
            .unwrap();
        let values: Vec<_> = product.iter().map(|i| i.value).collect();
        assert_eq!(values, vec![3, 12, 3]);
    }

    #[test]
    fn resolve_conflicts_folds_in_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.add(month(2024, 1), "a".to_string());
        timeline.add(Period::day(2024, 1, 1).unwrap(), "b".to_string());

        let joined = timeline
            .resolve_conflicts(|_, value, mut acc| {
                acc.push_str(value);
                acc
            })
            .unwrap();
        assert_eq!(joined.items()[0].value, "ab");
        assert_eq!(joined.items()[1].value, "a");
    }

    #[test]
    fn resolve_sorted_rejects_regressing_items() {
        let items = vec![
            PeriodValue::new(month(2024, 3), 300),
            PeriodValue::new(month(2024, 1), 100),
        ];
        let err = resolve_sorted(&items, &0, sum).unwrap_err();
        assert_eq!(
            err,
            TimelineError::UnsortedTimeline {
                period: month(2024, 1),
                extent: month(2024, 3),
            }
        );
    }

    #[test]
    fn resolve_sorted_rejects_item_starting_inside_but_before_cluster() {
        let items = vec![
            PeriodValue::new(month(2024, 2), 200),
            pv(date(2024, 1, 20), date(2024, 2, 10), 50),
        ];
        assert!(matches!(
            resolve_sorted(&items, &0, sum),
            Err(TimelineError::UnsortedTimeline { .. })
        ));
    }

    #[test]
    fn optimize_merges_equal_contiguous_runs() {
        let values = [100, 200, 300, 300, 300, 300, 400, 100, 800, 800, 900, 900];
        let timeline: Timeline<i64> = (1..=12)
            .zip(values)
            .map(|(m, v)| PeriodValue::new(month(2024, m), v))
            .collect();

        let optimized = timeline.optimize(|a, b| a == b);
        assert_snapshot!(optimized, @r"
        [2024-01-01T00:00:00Z, 2024-02-01T00:00:00Z) 100
        [2024-02-01T00:00:00Z, 2024-03-01T00:00:00Z) 200
        [2024-03-01T00:00:00Z, 2024-07-01T00:00:00Z) 300
        [2024-07-01T00:00:00Z, 2024-08-01T00:00:00Z) 400
        [2024-08-01T00:00:00Z, 2024-09-01T00:00:00Z) 100
        [2024-09-01T00:00:00Z, 2024-11-01T00:00:00Z) 800
        [2024-11-01T00:00:00Z, 2025-01-01T00:00:00Z) 900
        ");
    }

    #[test]
    fn optimize_keeps_gaps() {
        let timeline: Timeline<i64> = [(1, 100), (2, 200), (3, 300), (4, 300), (5, 300), (8, 300)]
            .into_iter()
            .map(|(m, v)| PeriodValue::new(month(2024, m), v))
            .collect();

        let optimized = timeline.optimize(|a, b| a == b);
        let periods: Vec<_> = optimized.iter().map(|i| i.period).collect();
        assert_eq!(
            periods,
            vec![
                month(2024, 1),
                month(2024, 2),
                Period::new(date(2024, 3, 1), date(2024, 6, 1)).unwrap(),
                month(2024, 8),
            ]
        );
    }

    #[test]
    fn optimize_is_idempotent() {
        let timeline: Timeline<i64> = [1, 1, 2, 2, 2, 1]
            .into_iter()
            .zip(1..)
            .map(|(v, m)| PeriodValue::new(month(2024, m), v))
            .collect();

        let once = timeline.optimize(|a, b| a == b);
        let twice = once.optimize(|a, b| a == b);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn optimize_of_empty_timeline_is_empty() {
        let timeline: Timeline<i64> = Timeline::new();
        assert!(timeline.optimize(|a, b| a == b).is_empty());
    }

    #[test]
    fn aggregate_with_empty_side_returns_other() {
        let timeline = quarter();
        let empty = Timeline::new();
        assert_eq!(timeline.aggregate(&empty, sum).unwrap(), timeline);
        assert_eq!(empty.aggregate(&timeline, sum).unwrap(), timeline);
    }

    #[test]
    fn aggregate_sums_overlapping_values() {
        let mut left = Timeline::new();
        left.add(month(2024, 1), 100);
        left.add(month(2024, 2), 200);

        let mut right = Timeline::new();
        right.add(Period::new(date(2024, 1, 20), date(2024, 2, 10)).unwrap(), 5);

        let total = left.aggregate(&right, sum).unwrap();
        assert_snapshot!(total, @r"
        [2024-01-01T00:00:00Z, 2024-01-20T00:00:00Z) 100
        [2024-01-20T00:00:00Z, 2024-02-01T00:00:00Z) 105
        [2024-02-01T00:00:00Z, 2024-02-10T00:00:00Z) 205
        [2024-02-10T00:00:00Z, 2024-03-01T00:00:00Z) 200
        ");
    }

    #[test]
    fn serde_roundtrip_keeps_empty_sentinel_item() {
        let mut timeline = Timeline::new();
        timeline.add(Period::empty(), 1_i64);
        timeline.add(month(2024, 1), 2);

        let encoded = serde_json::to_string(&timeline).unwrap();
        let decoded: Timeline<i64> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, timeline);
        assert!(decoded.items()[0].is_empty());
    }

    #[test]
    fn serde_roundtrip_restores_order() {
        let json = r#"[
            {"period": {"start": "2024-02-01T00:00:00Z", "end": "2024-03-01T00:00:00Z"}, "value": 2},
            {"period": {"start": "2024-01-01T00:00:00Z", "end": "2024-02-01T00:00:00Z"}, "value": 1}
        ]"#;
        let timeline: Timeline<i64> = serde_json::from_str(json).unwrap();
        assert_eq!(timeline.items()[0].value, 1);
        assert_eq!(timeline.items()[1].value, 2);

        let encoded = serde_json::to_string(&timeline).unwrap();
        let decoded: Timeline<i64> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, timeline);
    }
}
