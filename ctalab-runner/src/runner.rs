//! End-to-end run: load inputs, fit, report.
//!
//! Two entry points:
//! - `run_from_config()`: resolves inputs from the `[data]` section (or
//!   synthetic data), then runs. Used by the CLI.
//! - `run_from_data()`: takes pre-loaded inputs, no I/O.

use thiserror::Error;
use tracing::info;

use ctalab_core::condition::generate_flag_table;

use crate::backtest::{Backtest, BacktestError, FitInputs, FittedBacktest, FlagSource};
use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_inputs, LoadError, LoadOptions, LoadedData};
use crate::export::DataProvenance;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("backtest error: {0}")]
    Backtest(#[from] BacktestError),
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub load: LoadOptions,
    /// Also build one report per product.
    pub by_product: bool,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub fitted: FittedBacktest,
    pub provenance: DataProvenance,
}

pub fn run_from_config(config: &BacktestConfig, opts: &RunOptions) -> Result<RunOutcome, RunError> {
    let loaded = load_inputs(config, &opts.load)?;
    let fitted = run_from_data(config, &loaded, opts.by_product)?;
    Ok(RunOutcome {
        fitted,
        provenance: DataProvenance {
            dataset_hash: loaded.dataset_hash,
            has_synthetic: loaded.has_synthetic,
        },
    })
}

/// Fit and report on pre-loaded inputs. The event table comes from the
/// threshold machine, the `[rules]` table, or `data.flags`.
pub fn run_from_data(
    config: &BacktestConfig,
    loaded: &LoadedData,
    by_product: bool,
) -> Result<FittedBacktest, RunError> {
    let fit = config.to_fit_config()?;

    let backtest = match (fit.source, &config.rules) {
        (FlagSource::Rules, Some(rules)) => {
            let generated = generate_flag_table(rules, &loaded.ohlcv);
            info!(
                products = generated.table.width(),
                skipped = generated.skipped.len(),
                "rule flags generated"
            );
            Backtest::new().fit_flags(generated.table, fit)?
        }
        (FlagSource::Precomputed, _) => {
            let flags = loaded
                .flags
                .clone()
                .ok_or(LoadError::MissingPath("data.flags"))?;
            Backtest::new().fit_flags(flags, fit)?
        }
        _ => {
            let signals = loaded
                .signals
                .as_ref()
                .ok_or(LoadError::MissingPath("data.signal"))?;
            let inputs = FitInputs {
                signals,
                liquidity: loaded.liquidity.as_ref(),
            };
            Backtest::new().fit(inputs, fit)?
        }
    };

    let mut backtest = backtest.report(&loaded.prices, config.backtest.fold)?;
    if by_product {
        backtest = backtest.report_by_product(&loaded.prices)?;
    }

    match backtest {
        Backtest::Fitted(fitted) => Ok(*fitted),
        Backtest::Unfitted => Err(BacktestError::NotFitted.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic() -> RunOptions {
        RunOptions {
            load: LoadOptions {
                synthetic: true,
                bars_per_day: 4,
            },
            by_product: true,
        }
    }

    const CONFIG: &str = r#"
        [backtest]
        name = "synthetic"
        products = ["CU", "RB", "AL"]
        start_date = "2023-01-02"
        end_date = "2023-06-30"
        cost = 0.0002

        [thresholds]
        ma_window = 40
        open_coef = 1.5
        close_coef = 0.5
    "#;

    #[test]
    fn synthetic_threshold_run_reports() {
        let config = BacktestConfig::from_toml(CONFIG).unwrap();
        let outcome = run_from_config(&config, &synthetic()).unwrap();
        let report = outcome.fitted.report.as_ref().unwrap();

        assert!(outcome.provenance.has_synthetic);
        assert_eq!(outcome.fitted.flags.width(), 3);
        assert!(report.scorecard.all.trade_count > 0);
        assert_eq!(report.folds.rows.len(), 24);
        assert_eq!(outcome.fitted.product_reports.len(), 3);
    }

    #[test]
    fn synthetic_rule_run_reports() {
        let text = format!(
            "{CONFIG}\n\
             [rules.buy]\ntype = \"crossed_above\"\n\
             left = {{ type = \"field\", field = \"close\" }}\n\
             right = {{ type = \"sma\", of = {{ type = \"field\", field = \"close\" }}, period = 20 }}\n\
             [rules.sell]\ntype = \"crossed_below\"\n\
             left = {{ type = \"field\", field = \"close\" }}\n\
             right = {{ type = \"sma\", of = {{ type = \"field\", field = \"close\" }}, period = 20 }}\n"
        );
        let config = BacktestConfig::from_toml(&text).unwrap();
        let outcome = run_from_config(&config, &synthetic()).unwrap();
        let report = outcome.fitted.report.as_ref().unwrap();
        assert_eq!(outcome.fitted.config.source, crate::backtest::FlagSource::Rules);
        assert!(report.scorecard.all.trade_count > 0);
    }

    #[test]
    fn gated_variant_uses_synthetic_liquidity() {
        let text = CONFIG.replace("cost = 0.0002", "cost = 0.0002\nvariant = \"plain_liquidity\"");
        let config = BacktestConfig::from_toml(&text).unwrap();
        let outcome = run_from_config(&config, &synthetic()).unwrap();
        assert!(outcome.fitted.report.is_some());
    }
}
