//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), ignoring
//! undefined terms. The first bar has no previous close, so TR[0] = high-low.
//! ATR is the simple rolling mean of TR over `period` bars.
//! Lookback: period - 1.

use super::sma::rolling_mean;

/// True Range per bar. NaN only when every term is undefined.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let mut tr = vec![f64::NAN; n];

    for i in 0..n {
        let prev_close = if i == 0 { f64::NAN } else { close[i - 1] };
        let terms = [
            high[i] - low[i],
            (high[i] - prev_close).abs(),
            (low[i] - prev_close).abs(),
        ];
        tr[i] = terms
            .into_iter()
            .filter(|t| !t.is_nan())
            .fold(f64::NAN, f64::max);
    }

    tr
}

pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    rolling_mean(&true_range(high, low, close), period)
}
