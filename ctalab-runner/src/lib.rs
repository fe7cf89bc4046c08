//! CTALab Runner: backtest orchestration, statistics and artifacts.
//!
//! This crate builds on `ctalab-core` to provide:
//! - TOML run configuration
//! - Input loading per config, with a synthetic-data mode
//! - The fit / report backtest orchestrator
//! - Return statistics and holding-period attribution
//! - CSV and JSON artifact export

pub mod backtest;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod folds;
pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use backtest::{
    Backtest, BacktestError, FitConfig, FitInputs, FittedBacktest, FlagSource, ProductReport,
    Report,
};
pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{load_inputs, LoadError, LoadOptions, LoadedData};
pub use export::{save_artifacts, DataProvenance, RunManifest};
pub use folds::{fold_distribution, FoldRow, FoldTable};
pub use metrics::{compute_metrics, PnlCurve, Scorecard, TrackMetrics};
pub use runner::{run_from_config, run_from_data, RunError, RunOptions, RunOutcome};
pub use synthetic::SyntheticMarket;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_is_send_sync() {
        assert_send::<Backtest>();
        assert_sync::<Backtest>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<Report>();
        assert_sync::<Report>();
        assert_send::<Scorecard>();
        assert_sync::<Scorecard>();
        assert_send::<FoldTable>();
        assert_sync::<FoldTable>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn manifest_is_send_sync() {
        assert_send::<RunManifest>();
        assert_sync::<RunManifest>();
    }
}
