//! Relative Strength Index (RSI).
//!
//! Simple rolling means of gains and losses (not Wilder smoothing):
//! RSI = 100 - 100 / (1 + mean_gain / mean_loss) over `period` changes.
//! An undefined change (first bar, NaN neighbour) counts as zero gain and zero loss.
//! Edge cases: mean_loss == 0 and mean_gain > 0 -> 100; both zero -> NaN.

use super::sma::rolling_mean;

pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];

    for i in 1..n {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else if change < 0.0 {
            losses[i] = -change;
        }
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| compute_rsi(g, l))
        .collect()
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { f64::NAN };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
