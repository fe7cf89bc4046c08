//! Backtest orchestrator.
//!
//! A backtest is either unfitted or fitted. `fit` builds the event table
//! and moves to the fitted state; the report operations need a fitted value
//! and attach their results to it. Every transition consumes the value and
//! returns the next one, and re-fitting drops everything derived before.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::info;

use ctalab_core::trade::flag_column;
use ctalab_core::{
    aggregate, build_flags, CoreError, DataKind, DateRange, FlagRequest, FlagTable, MissingData,
    Panel, Product, ReturnMatrices, ThresholdParams, Variant,
};

use crate::folds::{fold_distribution, FoldTable};
use crate::metrics::{compute_metrics, PnlCurve, Scorecard};

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("backtest is not fitted; call fit first")]
    NotFitted,

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("failed to serialise fit configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where the event table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    Threshold,
    Rules,
    /// A numeric event table read from `data.flags`.
    Precomputed,
}

/// Everything `fit` needs besides the input tables. Hashing this gives the
/// run id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    pub name: String,
    pub products: Vec<Product>,
    pub range: DateRange,
    pub cost: f64,
    pub variant: Variant,
    pub params: ThresholdParams,
    pub source: FlagSource,
}

impl FitConfig {
    /// Deterministic content hash of this configuration.
    pub fn run_id(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

/// Input tables for the threshold path.
#[derive(Debug, Clone, Copy)]
pub struct FitInputs<'a> {
    pub signals: &'a Panel<f64>,
    pub liquidity: Option<&'a Panel<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub returns: ReturnMatrices,
    pub pnl: PnlCurve,
    pub scorecard: Scorecard,
    pub folds: FoldTable,
    pub skipped: Vec<MissingData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductReport {
    pub returns: ReturnMatrices,
    pub pnl: PnlCurve,
    pub scorecard: Scorecard,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedBacktest {
    pub config: FitConfig,
    pub run_id: String,
    pub flags: FlagTable,
    /// Products dropped while building the event table.
    pub skipped: Vec<MissingData>,
    pub report: Option<Report>,
    pub product_reports: BTreeMap<Product, ProductReport>,
}

impl FittedBacktest {
    /// Products with an event column, in key order. `_flag` suffixes are
    /// stripped.
    pub fn flagged_products(&self) -> Vec<Product> {
        self.flags
            .products()
            .map(|p| p.strip_suffix("_flag").unwrap_or(p).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Backtest {
    #[default]
    Unfitted,
    Fitted(Box<FittedBacktest>),
}

impl Backtest {
    pub fn new() -> Self {
        Self::Unfitted
    }

    pub fn fitted(&self) -> Option<&FittedBacktest> {
        match self {
            Self::Fitted(fitted) => Some(fitted),
            Self::Unfitted => None,
        }
    }

    /// Run the threshold machine over every configured product.
    pub fn fit(self, inputs: FitInputs<'_>, config: FitConfig) -> Result<Self, BacktestError> {
        let build = build_flags(&FlagRequest {
            signals: inputs.signals,
            products: &config.products,
            range: config.range,
            variant: config.variant,
            params: &config.params,
            liquidity: inputs.liquidity,
        })?;
        info!(
            name = %config.name,
            variant = %config.variant,
            products = build.table.width(),
            "fitted"
        );
        Self::fitted_with(build.table, build.skipped, config)
    }

    /// Adopt a precomputed event table, restricted to the configured date
    /// window and products.
    pub fn fit_flags(self, flags: FlagTable, config: FitConfig) -> Result<Self, BacktestError> {
        let window = flags.slice(&config.range);
        let mut columns = Vec::new();
        let mut skipped = Vec::new();
        for product in config.products.iter().collect::<BTreeSet<_>>() {
            match flag_column(&window, product) {
                Some(series) if !series.is_empty() => columns.push((product.clone(), series)),
                _ => {
                    let missing = MissingData::new(product.clone(), DataKind::Flag);
                    missing.warn_skipped();
                    skipped.push(missing);
                }
            }
        }
        let table = Panel::from_series(columns);
        info!(name = %config.name, products = table.width(), "fitted from event table");
        Self::fitted_with(table, skipped, config)
    }

    fn fitted_with(
        flags: FlagTable,
        skipped: Vec<MissingData>,
        config: FitConfig,
    ) -> Result<Self, BacktestError> {
        let run_id = config.run_id()?;
        Ok(Self::Fitted(Box::new(FittedBacktest {
            config,
            run_id,
            flags,
            skipped,
            report: None,
            product_reports: BTreeMap::new(),
        })))
    }

    /// Portfolio returns, statistics and fold attribution for the fitted
    /// event table. Prices are restricted to the fit window first.
    pub fn report(self, prices: &Panel<f64>, fold: usize) -> Result<Self, BacktestError> {
        let Self::Fitted(mut fitted) = self else {
            return Err(BacktestError::NotFitted);
        };
        if fold == 0 {
            return Err(CoreError::InvalidParameter("fold must be >= 1".into()).into());
        }

        let prices = prices.slice(&fitted.config.range);
        let products = fitted.flagged_products();
        let aggregation = aggregate(&fitted.flags, &prices, &products, fitted.config.cost);
        let (pnl, scorecard) = compute_metrics(&aggregation.matrices);
        let folds = fold_distribution(&fitted.flags, &prices, &products, fold);

        info!(
            trades = scorecard.all.trade_count,
            total_profit = ?scorecard.all.total_profit,
            "report complete"
        );
        fitted.report = Some(Report {
            returns: aggregation.matrices,
            pnl,
            scorecard,
            folds,
            skipped: aggregation.skipped,
        });
        Ok(Self::Fitted(fitted))
    }

    /// One report per configured product.
    pub fn report_by_product(self, prices: &Panel<f64>) -> Result<Self, BacktestError> {
        let Self::Fitted(mut fitted) = self else {
            return Err(BacktestError::NotFitted);
        };

        let prices = prices.slice(&fitted.config.range);
        let mut reports = BTreeMap::new();
        for product in fitted.config.products.iter().collect::<BTreeSet<_>>() {
            let aggregation = aggregate(
                &fitted.flags,
                &prices,
                std::slice::from_ref(product),
                fitted.config.cost,
            );
            if !aggregation.skipped.is_empty() {
                continue;
            }
            let (pnl, scorecard) = compute_metrics(&aggregation.matrices);
            reports.insert(
                product.clone(),
                ProductReport {
                    returns: aggregation.matrices,
                    pnl,
                    scorecard,
                },
            );
        }
        info!(products = reports.len(), "per-product reports complete");
        fitted.product_reports = reports;
        Ok(Self::Fitted(fitted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ctalab_core::{Flag, Series, Timestamp};

    fn ts(day: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn config(products: &[&str]) -> FitConfig {
        FitConfig {
            name: "unit".into(),
            products: products.iter().map(|p| p.to_string()).collect(),
            range: DateRange::parse("2024-01-01", "2024-01-31").unwrap(),
            cost: 0.0,
            variant: Variant::Plain,
            params: ThresholdParams::default(),
            source: FlagSource::Rules,
        }
    }

    fn events(product: &str, points: &[(u32, Flag)]) -> FlagTable {
        Panel::from_series([(
            product.to_string(),
            Series::from_pairs(points.iter().map(|(d, f)| (ts(*d), Some(*f)))),
        )])
    }

    fn closes(product: &str, points: &[(u32, f64)]) -> Panel<f64> {
        Panel::from_series([(
            product.to_string(),
            Series::from_pairs(points.iter().map(|(d, v)| (ts(*d), *v))),
        )])
    }

    #[test]
    fn report_requires_fit() {
        let prices = closes("CU", &[(1, 100.0)]);
        assert!(matches!(
            Backtest::new().report(&prices, 24),
            Err(BacktestError::NotFitted)
        ));
        assert!(matches!(
            Backtest::new().report_by_product(&prices),
            Err(BacktestError::NotFitted)
        ));
    }

    #[test]
    fn fit_flags_then_report() {
        let flags = events("CU", &[(2, Flag::OpenLong), (4, Flag::Close)]);
        let prices = closes("CU", &[(2, 100.0), (3, 105.0), (4, 110.0)]);

        let bt = Backtest::new()
            .fit_flags(flags, config(&["CU"]))
            .unwrap()
            .report(&prices, 2)
            .unwrap();
        let report = bt.fitted().unwrap().report.as_ref().unwrap();
        assert_eq!(report.scorecard.all.trade_count, 1);
        assert!((report.scorecard.all.total_profit.unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(report.folds.rows.len(), 2);
        assert_eq!(report.folds.rows[0].long, Some(50.0));
    }

    #[test]
    fn fit_flags_drops_products_outside_config() {
        let flags = events("CU", &[(2, Flag::OpenLong)]);
        let bt = Backtest::new().fit_flags(flags, config(&["RB"])).unwrap();
        let fitted = bt.fitted().unwrap();
        assert_eq!(fitted.flags.width(), 0);
        assert_eq!(fitted.skipped, vec![MissingData::new("RB", DataKind::Flag)]);
    }

    #[test]
    fn refit_discards_reports() {
        let flags = events("CU", &[(2, Flag::OpenLong), (4, Flag::Close)]);
        let prices = closes("CU", &[(2, 100.0), (4, 110.0)]);
        let bt = Backtest::new()
            .fit_flags(flags.clone(), config(&["CU"]))
            .unwrap()
            .report(&prices, 1)
            .unwrap();
        assert!(bt.fitted().unwrap().report.is_some());

        let bt = bt.fit_flags(flags, config(&["CU"])).unwrap();
        assert!(bt.fitted().unwrap().report.is_none());
    }

    #[test]
    fn zero_fold_is_rejected() {
        let flags = events("CU", &[(2, Flag::OpenLong)]);
        let bt = Backtest::new().fit_flags(flags, config(&["CU"])).unwrap();
        let prices = closes("CU", &[(2, 100.0)]);
        assert!(matches!(
            bt.report(&prices, 0),
            Err(BacktestError::Core(CoreError::InvalidParameter(_)))
        ));
    }

    #[test]
    fn per_product_reports_skip_missing_prices() {
        let mut columns = Vec::new();
        for product in ["CU", "RB"] {
            columns.push((
                product.to_string(),
                Series::from_pairs([(ts(2), Some(Flag::OpenShort)), (ts(3), Some(Flag::Close))]),
            ));
        }
        let flags = Panel::from_series(columns);
        let prices = closes("CU", &[(2, 100.0), (3, 90.0)]);

        let bt = Backtest::new()
            .fit_flags(flags, config(&["CU", "RB"]))
            .unwrap()
            .report_by_product(&prices)
            .unwrap();
        let reports = &bt.fitted().unwrap().product_reports;
        assert_eq!(reports.len(), 1);
        let cu = &reports["CU"];
        assert!((cu.scorecard.short.total_profit.unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn run_id_is_hex_blake3() {
        let id = config(&["CU"]).run_id().unwrap();
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
