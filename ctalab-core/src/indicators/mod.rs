//! Indicator functions over numeric columns.
//!
//! Each function takes column slices and returns a vector of the same
//! length, NaN where the indicator is still warming up or the window
//! touches an undefined value. They back the `Value` nodes of the
//! condition-expression AST and the threshold machine's rolling mean.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use atr::{atr, true_range};
pub use bollinger::{bollinger, BollingerBand};
pub use ema::ema;
pub use macd::{macd, MacdLine};
pub use rsi::rsi;
pub use sma::{rolling_mean, rolling_std};

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
