//! Serializable backtest configuration.
//!
//! A run is described by one TOML file:
//!
//! ```toml
//! [backtest]
//! name = "momentum_v2"
//! products = ["RB", "CU", "AL"]
//! start_date = "2019-01-01"
//! end_date = "2023-12-31"
//! cost = 0.0002
//! variant = "mean_centered"
//! fold = 24
//!
//! [thresholds]
//! ma_window = 500
//!
//! [data]
//! signal = "data/signal.parquet"
//! price = "data/close.parquet"
//! ```
//!
//! An optional `[rules]` table switches the run from threshold flags to
//! condition-rule flags evaluated over `data.ohlcv_dir`. Setting
//! `data.flags` instead adopts a precomputed `+1/-1/0` event table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use ctalab_core::condition::SignalRules;
use ctalab_core::{CoreError, DateRange, Product, ThresholdParams, Variant};

use crate::backtest::{FitConfig, FlagSource};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub thresholds: ThresholdParams,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub rules: Option<SignalRules>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacktestSection {
    pub name: String,
    pub products: Vec<Product>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub cost: f64,
    /// Variant name as written; see [`BacktestSection::variant`].
    #[serde(default = "default_variant", rename = "variant")]
    pub variant_name: String,
    #[serde(default = "default_fold")]
    pub fold: usize,
}

fn default_fold() -> usize {
    24
}

fn default_variant() -> String {
    Variant::default().name().to_string()
}

impl BacktestSection {
    /// The configured variant. Unknown names are fatal.
    pub fn variant(&self) -> Result<Variant, CoreError> {
        self.variant_name.parse()
    }
}

/// Input file locations. Not needed for synthetic runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataSection {
    pub signal: Option<PathBuf>,
    pub price: Option<PathBuf>,
    pub liquidity: Option<PathBuf>,
    /// Directory of `<PRODUCT>.csv` / `<PRODUCT>.parquet` OHLCV files.
    pub ohlcv_dir: Option<PathBuf>,
    /// Wide numeric event table; blank cells are "no event".
    pub flags: Option<PathBuf>,
}

impl BacktestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        Ok(config.resolve_paths(path.parent().unwrap_or_else(|| Path::new("."))))
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.name.trim().is_empty() {
            return Err(ConfigError::Invalid("backtest.name is empty".into()));
        }
        if b.products.is_empty() {
            return Err(ConfigError::Invalid("backtest.products is empty".into()));
        }
        if !b.cost.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "backtest.cost must be finite, got {}",
                b.cost
            )));
        }
        if b.fold == 0 {
            return Err(ConfigError::Invalid("backtest.fold must be >= 1".into()));
        }
        if self.rules.is_some() && self.data.flags.is_some() {
            return Err(ConfigError::Invalid(
                "[rules] and data.flags are mutually exclusive".into(),
            ));
        }
        b.variant()?;
        DateRange::new(b.start_date, b.end_date)?;
        self.thresholds.validate()?;
        Ok(())
    }

    /// Where the event table comes from.
    pub fn flag_source(&self) -> FlagSource {
        if self.rules.is_some() {
            FlagSource::Rules
        } else if self.data.flags.is_some() {
            FlagSource::Precomputed
        } else {
            FlagSource::Threshold
        }
    }

    pub fn to_fit_config(&self) -> Result<FitConfig, ConfigError> {
        let b = &self.backtest;
        Ok(FitConfig {
            name: b.name.clone(),
            products: b.products.clone(),
            range: DateRange::new(b.start_date, b.end_date)?,
            cost: b.cost,
            variant: b.variant()?,
            params: self.thresholds.clone(),
            source: self.flag_source(),
        })
    }

    /// Relative data paths are taken relative to the config file.
    fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        resolve(&mut self.data.signal);
        resolve(&mut self.data.price);
        resolve(&mut self.data.liquidity);
        resolve(&mut self.data.ohlcv_dir);
        resolve(&mut self.data.flags);
        self
    }
}
