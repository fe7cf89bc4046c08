//! Holding-period attribution.
//!
//! For every entry event, the price change of each of the next `fold` bars
//! is measured relative to the entry price:
//!
//! `contribution_k(t) = (p[t+k] - p[t+k-1]) / p[t]`
//!
//! positionally over the product's defined prices. Contributions are summed
//! per bar offset across entries and products, shorts negated, then each
//! column is expressed as a percentage of its total absolute contribution.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ctalab_core::trade::flag_column;
use ctalab_core::{Flag, FlagTable, Panel, Product};

/// One bar offset after entry (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FoldRow {
    pub fold: usize,
    pub all: Option<f64>,
    pub long: Option<f64>,
    pub short: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoldTable {
    pub rows: Vec<FoldRow>,
}

#[derive(Debug, Clone, PartialEq)]
struct FoldSums {
    long: Vec<f64>,
    short: Vec<f64>,
}

impl FoldSums {
    fn zeros(fold: usize) -> Self {
        Self {
            long: vec![0.0; fold],
            short: vec![0.0; fold],
        }
    }
}

fn product_sums(
    flags: &FlagTable,
    prices: &Panel<f64>,
    product: &str,
    fold: usize,
) -> Option<FoldSums> {
    let price = prices.column_defined(product)?;
    let events = flag_column(flags, product)?;
    let p = price.values();
    let index = price.index();

    let mut sums = FoldSums::zeros(fold);
    for (ts, flag) in events.iter() {
        let target = match flag {
            Some(Flag::OpenLong) => &mut sums.long,
            Some(Flag::OpenShort) => &mut sums.short,
            _ => continue,
        };
        let Ok(t) = index.binary_search(&ts) else { continue };
        let entry = p[t];
        for (k, slot) in target.iter_mut().enumerate() {
            let next = t + k + 1;
            if next >= p.len() {
                break;
            }
            let contribution = (p[next] - p[next - 1]) / entry;
            if contribution.is_finite() {
                *slot += contribution;
            }
        }
    }
    Some(sums)
}

/// Share of each entry in its column's total absolute contribution, in
/// percent, rounded to one decimal.
fn normalise(column: &[f64]) -> Vec<Option<f64>> {
    let total: f64 = column.iter().map(|v| v.abs()).sum();
    column
        .iter()
        .map(|v| (total > 0.0).then(|| (v / total * 1000.0).round() / 10.0))
        .collect()
}

pub fn fold_distribution(
    flags: &FlagTable,
    prices: &Panel<f64>,
    products: &[Product],
    fold: usize,
) -> FoldTable {
    let per_product: Vec<Option<FoldSums>> = products
        .par_iter()
        .map(|product| {
            let sums = product_sums(flags, prices, product, fold);
            if sums.is_none() {
                debug!(product = %product, "no price or flag column for fold attribution");
            }
            sums
        })
        .collect();

    let mut total = FoldSums::zeros(fold);
    for sums in per_product.into_iter().flatten() {
        for k in 0..fold {
            total.long[k] += sums.long[k];
            total.short[k] -= sums.short[k];
        }
    }
    let combined: Vec<f64> = total.long.iter().zip(&total.short).map(|(l, s)| l + s).collect();

    let all = normalise(&combined);
    let long = normalise(&total.long);
    let short = normalise(&total.short);

    FoldTable {
        rows: (0..fold)
            .map(|k| FoldRow {
                fold: k + 1,
                all: all[k],
                long: long[k],
                short: short[k],
            })
            .collect(),
    }
}
