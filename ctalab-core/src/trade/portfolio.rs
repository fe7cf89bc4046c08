//! Portfolio aggregation.
//!
//! Runs the return calculator per product and lays the results out as three
//! time x product matrices (all / long / short) on a shared axis: the price
//! index unioned with every return timestamp. Cells without a realised
//! return stay undefined; they are not zero.

use rayon::prelude::*;
use tracing::info;

use super::returns::{compute_returns, TradeReturns};
use crate::domain::{FlagSeries, FlagTable, Panel, Product, Series, Timestamp};
use crate::error::{DataKind, MissingData};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnMatrices {
    pub all: Panel<f64>,
    pub long: Panel<f64>,
    pub short: Panel<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub matrices: ReturnMatrices,
    pub skipped: Vec<MissingData>,
}

/// Flag column for `product`: the product name itself, or `{product}_flag`.
pub fn flag_column(flags: &FlagTable, product: &str) -> Option<FlagSeries> {
    flags
        .column_defined(product)
        .or_else(|| flags.column_defined(&format!("{product}_flag")))
}

pub fn aggregate(
    flags: &FlagTable,
    prices: &Panel<f64>,
    products: &[Product],
    cost: f64,
) -> Aggregation {
    let outcomes: Vec<Result<(Product, TradeReturns), MissingData>> = products
        .par_iter()
        .map(|product| {
            let price = prices
                .column_defined(product)
                .ok_or_else(|| MissingData::new(product.clone(), DataKind::Price))?;
            let events = flag_column(flags, product)
                .ok_or_else(|| MissingData::new(product.clone(), DataKind::Flag))?;
            Ok((product.clone(), compute_returns(&events, &price, cost)))
        })
        .collect();

    let mut returns = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(pair) => returns.push(pair),
            Err(missing) => {
                missing.warn_skipped();
                skipped.push(missing);
            }
        }
    }
    returns.sort_by(|a, b| a.0.cmp(&b.0));
    skipped.sort_by(|a, b| a.product.cmp(&b.product));

    let axis = prices.index();
    let matrices = ReturnMatrices {
        all: side_matrix(axis, &returns, |r| &r.combined),
        long: side_matrix(axis, &returns, |r| &r.long),
        short: side_matrix(axis, &returns, |r| &r.short),
    };

    info!(
        products = matrices.all.width(),
        skipped = skipped.len(),
        trades = matrices.all.count_defined(),
        "aggregated returns"
    );
    Aggregation { matrices, skipped }
}

fn side_matrix(
    axis: &[Timestamp],
    returns: &[(Product, TradeReturns)],
    pick: impl Fn(&TradeReturns) -> &Series<f64>,
) -> Panel<f64> {
    Panel::from_series_on(
        axis,
        returns.iter().map(|(p, r)| (p.clone(), pick(r).clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Flag;
    use chrono::{Duration, NaiveDate};

    fn ts(i: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + Duration::hours(i)
    }

    fn price_series(values: &[f64]) -> Series<f64> {
        Series::from_pairs(values.iter().enumerate().map(|(i, v)| (ts(i as i64), *v)))
    }

    fn flag_series(events: &[(i64, Flag)]) -> FlagSeries {
        Series::from_pairs(events.iter().map(|(i, f)| (ts(*i), Some(*f))))
    }

    #[test]
    fn portfolio_sum_matches_products() {
        let prices = Panel::from_series(vec![
            ("RB".to_string(), price_series(&[100.0, 110.0, 120.0, 130.0])),
            ("CU".to_string(), price_series(&[50.0, 40.0, 45.0, 50.0])),
        ]);
        let flags = Panel::from_series(vec![
            ("RB".to_string(), flag_series(&[(0, Flag::OpenLong), (1, Flag::Close)])),
            ("CU".to_string(), flag_series(&[(0, Flag::OpenShort), (1, Flag::Close)])),
        ]);
        let products = vec!["RB".to_string(), "CU".to_string()];
        let agg = aggregate(&flags, &prices, &products, 0.0);

        assert_eq!(agg.matrices.all.height(), 4);
        let total = agg.matrices.all.row_sums();
        assert!((total.get(ts(1)).unwrap() - (0.1 + 0.2)).abs() < 1e-12);
        assert!(total.get(ts(2)).unwrap().is_nan());
        assert!(agg.matrices.long.cells("CU").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn missing_inputs_skip_product() {
        let prices = Panel::from_series(vec![("RB".to_string(), price_series(&[100.0, 110.0]))]);
        let flags = Panel::from_series(vec![
            ("RB".to_string(), flag_series(&[(0, Flag::OpenLong), (1, Flag::Close)])),
            ("AU".to_string(), flag_series(&[(0, Flag::OpenLong)])),
        ]);
        let products = vec!["AU".to_string(), "RB".to_string(), "ZN".to_string()];
        let agg = aggregate(&flags, &prices, &products, 0.0);

        assert_eq!(agg.matrices.all.products().collect::<Vec<_>>(), vec!["RB"]);
        assert_eq!(
            agg.skipped,
            vec![
                MissingData::new("AU", DataKind::Price),
                MissingData::new("ZN", DataKind::Price),
            ]
        );
    }

    #[test]
    fn suffixed_flag_column_is_accepted() {
        let prices = Panel::from_series(vec![("RB".to_string(), price_series(&[100.0, 110.0]))]);
        let flags = Panel::from_series(vec![(
            "RB_flag".to_string(),
            flag_series(&[(0, Flag::OpenLong), (1, Flag::Close)]),
        )]);
        let agg = aggregate(&flags, &prices, &["RB".to_string()], 0.0);
        assert!(agg.skipped.is_empty());
        assert_eq!(agg.matrices.all.count_defined(), 1);
    }
}
