//! Input resolution for a configured run.
//!
//! Real runs read the wide panels named in `[data]`; rule runs additionally
//! read one OHLCV file per product from `data.ohlcv_dir`, and precomputed
//! runs decode `data.flags`. With `synthetic` set, nothing is read and every
//! table comes from [`SyntheticMarket`]. Synthetic results are tagged in the
//! run manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use ctalab_core::data::{load_ohlcv, load_panel};
use ctalab_core::{
    CoreError, DataKind, DateRange, FlagTable, MissingData, OhlcvFrame, Panel, Product,
};

use crate::backtest::FlagSource;
use crate::config::BacktestConfig;
use crate::synthetic::SyntheticMarket;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("config has no '{0}' path (use --synthetic for synthetic data)")]
    MissingPath(&'static str),

    #[error("a precomputed event table cannot be synthesised; drop --synthetic")]
    SyntheticFlags,

    #[error(transparent)]
    Data(#[from] ctalab_core::data::LoadError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub synthetic: bool,
    /// Bars per session for synthetic data.
    pub bars_per_day: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            synthetic: false,
            bars_per_day: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Signal panel; only threshold runs have one.
    pub signals: Option<Panel<f64>>,
    /// Decoded `data.flags` table for precomputed runs.
    pub flags: Option<FlagTable>,
    pub prices: Panel<f64>,
    pub liquidity: Option<Panel<f64>>,
    /// OHLCV frames for rule runs, keyed by product.
    pub ohlcv: BTreeMap<Product, OhlcvFrame>,
    /// Products without an OHLCV file.
    pub skipped: Vec<MissingData>,
    /// BLAKE3 over the loaded price and signal cells.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

pub fn load_inputs(config: &BacktestConfig, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    if opts.synthetic {
        return load_synthetic(config, opts);
    }

    let data = &config.data;
    let prices = load_panel(require(&data.price, "data.price")?)?;

    let mut signals = None;
    let mut flags = None;
    let mut ohlcv = BTreeMap::new();
    let mut skipped = Vec::new();
    match config.flag_source() {
        FlagSource::Threshold => {
            signals = Some(load_panel(require(&data.signal, "data.signal")?)?);
        }
        FlagSource::Rules => {
            let dir = require(&data.ohlcv_dir, "data.ohlcv_dir")?;
            (ohlcv, skipped) = load_ohlcv_dir(dir, &config.backtest.products)?;
        }
        FlagSource::Precomputed => {
            let codes = load_panel(require(&data.flags, "data.flags")?)?;
            flags = Some(FlagTable::from_codes(&codes));
        }
    }

    let liquidity = match &data.liquidity {
        Some(path) => Some(load_panel(path)?),
        None => None,
    };

    let dataset_hash = dataset_hash(&prices, signals.as_ref());
    info!(
        prices = prices.width(),
        signals = signals.as_ref().map_or(0, |s| s.width()),
        flags = flags.as_ref().map_or(0, |f| f.width()),
        ohlcv = ohlcv.len(),
        "inputs loaded"
    );
    Ok(LoadedData {
        signals,
        flags,
        prices,
        liquidity,
        ohlcv,
        skipped,
        dataset_hash,
        has_synthetic: false,
    })
}

fn load_synthetic(config: &BacktestConfig, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let uses_rules = match config.flag_source() {
        FlagSource::Threshold => false,
        FlagSource::Rules => true,
        FlagSource::Precomputed => return Err(LoadError::SyntheticFlags),
    };
    let range = DateRange::new(config.backtest.start_date, config.backtest.end_date)?;
    warn!("generating synthetic data; results will be tagged as synthetic");
    let market = SyntheticMarket::generate(&config.backtest.products, &range, opts.bars_per_day)?;
    let dataset_hash = dataset_hash(&market.prices, Some(&market.signals));
    Ok(LoadedData {
        signals: (!uses_rules).then_some(market.signals),
        flags: None,
        prices: market.prices,
        liquidity: Some(market.liquidity),
        ohlcv: if uses_rules { market.ohlcv } else { BTreeMap::new() },
        skipped: Vec::new(),
        dataset_hash,
        has_synthetic: true,
    })
}

fn require<'a>(path: &'a Option<PathBuf>, key: &'static str) -> Result<&'a Path, LoadError> {
    path.as_deref().ok_or(LoadError::MissingPath(key))
}

/// `<dir>/<PRODUCT>.parquet` wins over `<dir>/<PRODUCT>.csv`. A product with
/// neither file is skipped.
pub fn load_ohlcv_dir(
    dir: &Path,
    products: &[Product],
) -> Result<(BTreeMap<Product, OhlcvFrame>, Vec<MissingData>), LoadError> {
    let mut frames = BTreeMap::new();
    let mut skipped = Vec::new();
    for product in products {
        let file = ["parquet", "csv"]
            .iter()
            .map(|ext| dir.join(format!("{product}.{ext}")))
            .find(|p| p.is_file());
        match file {
            Some(path) => {
                frames.insert(product.clone(), load_ohlcv(&path)?);
            }
            None => {
                let missing = MissingData::new(product.clone(), DataKind::Price);
                warn!(product = %product, dir = %dir.display(), "no OHLCV file: {missing}");
                skipped.push(missing);
            }
        }
    }
    Ok((frames, skipped))
}

/// Deterministic hash over panel contents in product key order.
pub fn dataset_hash(prices: &Panel<f64>, signals: Option<&Panel<f64>>) -> String {
    let mut hasher = blake3::Hasher::new();
    for panel in std::iter::once(prices).chain(signals) {
        for ts in panel.index() {
            hasher.update(ts.to_string().as_bytes());
        }
        for product in panel.products() {
            hasher.update(product.as_bytes());
            for v in panel.cells(product).unwrap_or_default() {
                hasher.update(&v.to_le_bytes());
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}
