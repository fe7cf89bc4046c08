//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! - Middle: SMA(values, period)
//! - Upper: middle + mult * stddev(values, period)
//! - Lower: middle - mult * stddev(values, period)
//!
//! Uses sample stddev (divide by N-1).
//! Lookback: period - 1.

use serde::{Deserialize, Serialize};

use super::sma::{rolling_mean, rolling_std};

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

pub fn bollinger(values: &[f64], period: usize, multiplier: f64, band: BollingerBand) -> Vec<f64> {
    let middle = rolling_mean(values, period);
    if band == BollingerBand::Middle {
        return middle;
    }
    let std = rolling_std(values, period);
    let sign = match band {
        BollingerBand::Upper => 1.0,
        _ => -1.0,
    };
    middle
        .iter()
        .zip(&std)
        .map(|(&m, &s)| m + sign * multiplier * s)
        .collect()
}
