//! Series — a time-indexed column of cells.
//!
//! The index is strictly ascending with no duplicate timestamps. Each cell
//! type defines its own "undefined" value through [`Cell`]: numeric series
//! use `f64::NAN` (the void-bar convention), event series use `None`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::range::DateRange;
use crate::error::CoreError;

/// Bar timestamp. Intraday bars are common, so the index is date + time.
pub type Timestamp = NaiveDateTime;

/// A cell type with a distinguished "no observation" value.
pub trait Cell: Copy + Send + Sync + 'static {
    fn undefined() -> Self;
    fn is_defined(&self) -> bool;
}

impl Cell for f64 {
    fn undefined() -> Self {
        f64::NAN
    }

    fn is_defined(&self) -> bool {
        !self.is_nan()
    }
}

impl<T: Copy + Send + Sync + 'static> Cell for Option<T> {
    fn undefined() -> Self {
        None
    }

    fn is_defined(&self) -> bool {
        self.is_some()
    }
}

/// Time-indexed series. `index.len() == values.len()` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series<T> {
    index: Vec<Timestamp>,
    values: Vec<T>,
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self {
            index: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T: Cell> Series<T> {
    /// Build a series from a pre-sorted index.
    ///
    /// Fails if the lengths differ or the index is not strictly ascending.
    pub fn new(index: Vec<Timestamp>, values: Vec<T>) -> Result<Self, CoreError> {
        if index.len() != values.len() {
            return Err(CoreError::InvalidSeries(format!(
                "index has {} entries but values has {}",
                index.len(),
                values.len()
            )));
        }
        if let Some(pos) = index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(CoreError::InvalidSeries(format!(
                "index not strictly ascending at position {}: {} then {}",
                pos + 1,
                index[pos],
                index[pos + 1]
            )));
        }
        Ok(Self { index, values })
    }

    /// Build a series from unordered pairs. Sorts by timestamp; on duplicate
    /// timestamps the last pair wins.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Timestamp, T)>) -> Self {
        let mut pairs: Vec<(Timestamp, T)> = pairs.into_iter().collect();
        // Stable sort keeps input order among equal keys, so "last wins" holds.
        pairs.sort_by_key(|(ts, _)| *ts);

        let mut index: Vec<Timestamp> = Vec::with_capacity(pairs.len());
        let mut values: Vec<T> = Vec::with_capacity(pairs.len());
        for (ts, v) in pairs {
            if index.last() == Some(&ts) {
                if let Some(last) = values.last_mut() {
                    *last = v;
                }
            } else {
                index.push(ts);
                values.push(v);
            }
        }
        Self { index, values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, T)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    /// Cell at `ts`, or `None` if the timestamp is not in the index.
    pub fn get(&self, ts: Timestamp) -> Option<T> {
        self.index
            .binary_search(&ts)
            .ok()
            .map(|pos| self.values[pos])
    }

    /// Drop every row whose cell is undefined.
    pub fn dropna(&self) -> Self {
        let (index, values) = self.iter().filter(|(_, v)| v.is_defined()).unzip();
        Self { index, values }
    }

    /// Keep rows whose calendar date lies inside `range` (inclusive).
    pub fn slice(&self, range: &DateRange) -> Self {
        let (index, values) = self.iter().filter(|(ts, _)| range.contains(*ts)).unzip();
        Self { index, values }
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_defined()).count()
    }

    /// Last row, defined or not.
    pub fn last(&self) -> Option<(Timestamp, T)> {
        self.index.last().copied().zip(self.values.last().copied())
    }

    /// Apply `f` to every cell, keeping the index.
    pub fn map<U: Cell>(&self, f: impl Fn(T) -> U) -> Series<U> {
        Series {
            index: self.index.clone(),
            values: self.values.iter().map(|v| f(*v)).collect(),
        }
    }

    /// Cells aligned onto `target`, which must be ascending. Timestamps not in
    /// this series produce undefined cells.
    pub fn reindex(&self, target: &[Timestamp]) -> Vec<T> {
        let mut out = Vec::with_capacity(target.len());
        let mut pos = 0;
        for ts in target {
            while pos < self.index.len() && self.index[pos] < *ts {
                pos += 1;
            }
            if pos < self.index.len() && self.index[pos] == *ts {
                out.push(self.values[pos]);
            } else {
                out.push(T::undefined());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let result = Series::new(vec![ts(2, 9)], vec![1.0, 2.0]);
        assert!(matches!(result, Err(CoreError::InvalidSeries(_))));
    }

    #[test]
    fn new_rejects_unsorted_index() {
        let result = Series::new(vec![ts(3, 9), ts(2, 9)], vec![1.0, 2.0]);
        assert!(result.is_err());
    }

    #[test]
    fn from_pairs_sorts_and_last_duplicate_wins() {
        let s = Series::from_pairs(vec![
            (ts(3, 9), 3.0),
            (ts(2, 9), 1.0),
            (ts(2, 9), 2.0),
        ]);
        assert_eq!(s.index(), &[ts(2, 9), ts(3, 9)]);
        assert_eq!(s.values(), &[2.0, 3.0]);
    }

    #[test]
    fn dropna_removes_undefined_rows() {
        let s = Series::from_pairs(vec![(ts(2, 9), 1.0), (ts(2, 10), f64::NAN), (ts(2, 11), 3.0)]);
        let d = s.dropna();
        assert_eq!(d.len(), 2);
        assert_eq!(d.values(), &[1.0, 3.0]);
        assert_eq!(s.defined_count(), 2);
    }

    #[test]
    fn slice_is_inclusive_of_whole_end_day() {
        let s = Series::from_pairs(vec![
            (ts(1, 9), 1.0),
            (ts(2, 9), 2.0),
            (ts(3, 15), 3.0),
            (ts(4, 9), 4.0),
        ]);
        let range = DateRange::parse("2024-01-02", "2024-01-03").unwrap();
        let sliced = s.slice(&range);
        assert_eq!(sliced.values(), &[2.0, 3.0]);
    }

    #[test]
    fn reindex_fills_gaps_with_undefined() {
        let s: Series<Option<i8>> =
            Series::from_pairs(vec![(ts(2, 9), Some(1)), (ts(4, 9), Some(0))]);
        let target = [ts(1, 9), ts(2, 9), ts(3, 9), ts(4, 9), ts(5, 9)];
        assert_eq!(s.reindex(&target), vec![None, Some(1), None, Some(0), None]);
    }
}
