//! Panel — a wide, product-keyed table on one shared timeline.
//!
//! Products are columns, timestamps are rows. Columns live in a `BTreeMap`,
//! so iteration order is the product key order regardless of how the panel
//! was assembled. Absent observations are undefined cells (NaN / `None`),
//! never forward-filled.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::range::DateRange;
use super::series::{Cell, Series, Timestamp};

/// Product identifier (futures root symbol, e.g. `"RB"`).
pub type Product = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel<T> {
    index: Vec<Timestamp>,
    columns: BTreeMap<Product, Vec<T>>,
}

impl<T> Default for Panel<T> {
    fn default() -> Self {
        Self {
            index: Vec::new(),
            columns: BTreeMap::new(),
        }
    }
}

impl<T: Cell> Panel<T> {
    /// Outer-join per-product series onto the union of their timestamps.
    pub fn from_series(series: impl IntoIterator<Item = (Product, Series<T>)>) -> Self {
        Self::from_series_on(&[], series)
    }

    /// Outer-join per-product series onto the union of `base` and every
    /// series' timestamps. `base` need not be sorted.
    pub fn from_series_on(
        base: &[Timestamp],
        series: impl IntoIterator<Item = (Product, Series<T>)>,
    ) -> Self {
        let series: Vec<(Product, Series<T>)> = series.into_iter().collect();

        let mut all: BTreeSet<Timestamp> = base.iter().copied().collect();
        for (_, s) in &series {
            all.extend(s.index().iter().copied());
        }
        let index: Vec<Timestamp> = all.into_iter().collect();

        let columns = series
            .into_iter()
            .map(|(product, s)| {
                let cells = s.reindex(&index);
                (product, cells)
            })
            .collect();

        Self { index, columns }
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.index.len()
    }

    /// Number of product columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn products(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(|p| p.as_str())
    }

    /// Raw cells of one column, aligned with [`Panel::index`].
    pub fn cells(&self, product: &str) -> Option<&[T]> {
        self.columns.get(product).map(|v| v.as_slice())
    }

    /// One column as a series on the full panel index (undefined rows kept).
    pub fn column(&self, product: &str) -> Option<Series<T>> {
        let cells = self.columns.get(product)?;
        Some(Series::from_pairs(
            self.index.iter().copied().zip(cells.iter().copied()),
        ))
    }

    /// One column with undefined rows removed.
    pub fn column_defined(&self, product: &str) -> Option<Series<T>> {
        self.column(product).map(|s| s.dropna())
    }

    /// Rows whose calendar date lies inside `range`.
    pub fn slice(&self, range: &DateRange) -> Self {
        let keep: Vec<bool> = self.index.iter().map(|ts| range.contains(*ts)).collect();
        let index = self
            .index
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(ts, _)| *ts)
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|(product, cells)| {
                let kept = cells
                    .iter()
                    .zip(&keep)
                    .filter(|(_, k)| **k)
                    .map(|(c, _)| *c)
                    .collect();
                (product.clone(), kept)
            })
            .collect();
        Self { index, columns }
    }

    /// Every cell of every column, column-major.
    pub fn all_cells(&self) -> impl Iterator<Item = T> + '_ {
        self.columns.values().flat_map(|cells| cells.iter().copied())
    }

    pub fn count_defined(&self) -> usize {
        self.all_cells().filter(|c| c.is_defined()).count()
    }
}

impl Panel<f64> {
    /// Cross-sectional sum per row. Undefined cells count as zero; a row is
    /// undefined only when every product is undefined there.
    pub fn row_sums(&self) -> Series<f64> {
        let values: Vec<f64> = (0..self.index.len())
            .map(|row| {
                let mut seen = false;
                let mut sum = 0.0;
                for cells in self.columns.values() {
                    let v = cells[row];
                    if !v.is_nan() {
                        seen = true;
                        sum += v;
                    }
                }
                if seen {
                    sum
                } else {
                    f64::NAN
                }
            })
            .collect();
        Series::from_pairs(self.index.iter().copied().zip(values))
    }
}
