//! Moving Average Convergence Divergence (MACD).
//!
//! macd = EMA(fast) - EMA(slow); signal = EMA(macd, signal_period);
//! hist = macd - signal. EMAs seed on the first value, so there is no
//! warmup beyond leading NaN input.

use serde::{Deserialize, Serialize};

use super::ema::ema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdLine {
    Macd,
    Signal,
    Hist,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize, line: MacdLine) -> Vec<f64> {
    let fast_ema = ema(values, fast);
    let slow_ema = ema(values, slow);
    let macd_line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    if line == MacdLine::Macd {
        return macd_line;
    }
    let signal_line = ema(&macd_line, signal);
    match line {
        MacdLine::Signal => signal_line,
        _ => macd_line
            .iter()
            .zip(&signal_line)
            .map(|(m, s)| m - s)
            .collect(),
    }
}
