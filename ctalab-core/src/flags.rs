//! Multi-product flag building.
//!
//! Runs the threshold machine over every requested product within a date
//! window. A product with no usable signal (or, for gated variants, no
//! liquidity column) is skipped with a warning; the batch carries on.
//! Products are processed in parallel and the results are joined in product
//! key order, so the output never depends on scheduling.

use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::domain::{DateRange, FlagSeries, FlagTable, Panel, Product};
use crate::error::{CoreError, DataKind, MissingData};
use crate::threshold::{convert, LiquidityGate, ThresholdParams, Variant};

/// Inputs of one flag-building run.
#[derive(Debug, Clone, Copy)]
pub struct FlagRequest<'a> {
    pub signals: &'a Panel<f64>,
    pub products: &'a [Product],
    pub range: DateRange,
    pub variant: Variant,
    pub params: &'a ThresholdParams,
    pub liquidity: Option<&'a Panel<f64>>,
}

/// Combined event table plus the products that were skipped.
#[derive(Debug, Clone, Default)]
pub struct FlagBuild {
    pub table: FlagTable,
    pub skipped: Vec<MissingData>,
}

pub fn build_flags(request: &FlagRequest<'_>) -> Result<FlagBuild, CoreError> {
    request.params.validate()?;

    let liquidity = match (request.variant.liquidity_gated(), request.liquidity) {
        (true, None) => {
            return Err(CoreError::MissingLiquidityTable(
                request.variant.name().to_string(),
            ))
        }
        (true, Some(table)) => Some(table),
        (false, _) => None,
    };

    let products: Vec<&Product> = request
        .products
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let outcomes = products
        .par_iter()
        .map(|product| product_flags(request, liquidity, product))
        .collect::<Result<Vec<_>, CoreError>>()?;

    let mut built: Vec<(Product, FlagSeries)> = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(pair) => built.push(pair),
            Err(missing) => {
                missing.warn_skipped();
                skipped.push(missing);
            }
        }
    }
    built.sort_by(|a, b| a.0.cmp(&b.0));
    skipped.sort_by(|a, b| a.product.cmp(&b.product));

    let table = Panel::from_series(built);
    info!(
        variant = %request.variant,
        products = table.width(),
        skipped = skipped.len(),
        events = table.count_defined(),
        "built flag table"
    );
    Ok(FlagBuild { table, skipped })
}

/// Outer `Result` is fatal, inner `Err` is a skipped product.
fn product_flags(
    request: &FlagRequest<'_>,
    liquidity: Option<&Panel<f64>>,
    product: &Product,
) -> Result<Result<(Product, FlagSeries), MissingData>, CoreError> {
    let signal = match request.signals.column(product) {
        Some(col) => col.slice(&request.range).dropna(),
        None => return Ok(Err(MissingData::new(product.clone(), DataKind::Signal))),
    };
    if signal.is_empty() {
        return Ok(Err(MissingData::new(product.clone(), DataKind::Signal)));
    }

    let liquidity_series = match liquidity {
        Some(table) => match table.column(product) {
            Some(col) => Some(col),
            None => return Ok(Err(MissingData::new(product.clone(), DataKind::Liquidity))),
        },
        None => None,
    };
    let gate = liquidity_series.as_ref().map(|series| LiquidityGate {
        series,
        threshold: request.params.liquidity_threshold,
    });

    let flags = convert(&signal, request.params, request.variant.mean_centered(), gate)?;
    debug!(product = %product, rows = flags.len(), events = flags.defined_count(), "converted");
    Ok(Ok((product.clone(), flags)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Flag, Series, Timestamp};
    use chrono::{Duration, NaiveDate};

    fn ts(i: usize) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::days(i as i64)
    }

    fn series(values: &[f64]) -> Series<f64> {
        Series::from_pairs(values.iter().enumerate().map(|(i, v)| (ts(i), *v)))
    }

    fn params() -> ThresholdParams {
        ThresholdParams {
            ma_window: 3,
            ..Default::default()
        }
    }

    fn signals() -> Panel<f64> {
        Panel::from_series(vec![
            ("RB".to_string(), series(&[0.1, 0.1, 0.1, 0.1, 1.0, 0.1, -1.0, 0.1])),
            ("CU".to_string(), series(&[0.1, 0.1, 0.1, 0.1, -1.0, -0.1, 1.0, 0.1])),
        ])
    }

    fn full_range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-12-31").unwrap()
    }

    #[test]
    fn skips_missing_product_and_keeps_going() {
        let signals = signals();
        let products = vec!["RB".to_string(), "AU".to_string(), "CU".to_string()];
        let params = params();
        let build = build_flags(&FlagRequest {
            signals: &signals,
            products: &products,
            range: full_range(),
            variant: Variant::Plain,
            params: &params,
            liquidity: None,
        })
        .unwrap();

        assert_eq!(build.table.products().collect::<Vec<_>>(), vec!["CU", "RB"]);
        assert_eq!(build.skipped, vec![MissingData::new("AU", DataKind::Signal)]);
        assert_eq!(build.table.column("RB").unwrap().get(ts(5)), Some(Some(Flag::OpenLong)));
        assert_eq!(build.table.column("CU").unwrap().get(ts(5)), Some(Some(Flag::OpenShort)));
    }

    #[test]
    fn gated_variant_without_liquidity_table_is_fatal() {
        let signals = signals();
        let products = vec!["RB".to_string()];
        let params = params();
        let err = build_flags(&FlagRequest {
            signals: &signals,
            products: &products,
            range: full_range(),
            variant: Variant::PlainLiquidity,
            params: &params,
            liquidity: None,
        })
        .unwrap_err();
        assert!(matches!(err, CoreError::MissingLiquidityTable(_)));
    }

    #[test]
    fn gated_variant_skips_product_without_liquidity_column() {
        let signals = signals();
        let liquidity = Panel::from_series(vec![("RB".to_string(), series(&[5e9; 8]))]);
        let products = vec!["RB".to_string(), "CU".to_string()];
        let params = params();
        let build = build_flags(&FlagRequest {
            signals: &signals,
            products: &products,
            range: full_range(),
            variant: Variant::PlainLiquidity,
            params: &params,
            liquidity: Some(&liquidity),
        })
        .unwrap();
        assert_eq!(build.table.products().collect::<Vec<_>>(), vec!["RB"]);
        assert_eq!(build.skipped, vec![MissingData::new("CU", DataKind::Liquidity)]);
        assert_eq!(build.table.column("RB").unwrap().get(ts(5)), Some(Some(Flag::OpenLong)));
    }

    #[test]
    fn window_outside_data_skips_everything() {
        let signals = signals();
        let products = vec!["RB".to_string()];
        let params = params();
        let build = build_flags(&FlagRequest {
            signals: &signals,
            products: &products,
            range: DateRange::parse("2030-01-01", "2030-12-31").unwrap(),
            variant: Variant::Plain,
            params: &params,
            liquidity: None,
        })
        .unwrap();
        assert!(build.table.is_empty());
        assert_eq!(build.skipped.len(), 1);
    }
}
