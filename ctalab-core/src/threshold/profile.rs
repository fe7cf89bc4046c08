//! Threshold profile: the four lines a signal is compared against.
//!
//! Built from the one-step-shifted signal s'[t] = s[t-1]:
//!   ma[t]          = mean(|s'| over the trailing `ma_window` rows)
//!   long_open[t]   =  ma[t] * open_coef
//!   short_open[t]  = -ma[t] * open_coef
//!   long_close[t]  = -ma[t] * close_coef
//!   short_close[t] =  ma[t] * close_coef
//! Rows before the rolling mean is defined are warm-up and are dropped.
//! `ma` is clamped at zero, so a flat-zero stretch never crosses a line.

use crate::domain::{Series, Timestamp};
use crate::indicators::rolling_mean;

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdProfile {
    pub index: Vec<Timestamp>,
    /// Shifted (and optionally mean-centered) signal.
    pub signal: Vec<f64>,
    pub long_open: Vec<f64>,
    pub short_open: Vec<f64>,
    pub long_close: Vec<f64>,
    pub short_close: Vec<f64>,
}

impl ThresholdProfile {
    pub fn build(
        signal: &Series<f64>,
        ma_window: usize,
        open_coef: f64,
        close_coef: f64,
        mean_center: bool,
    ) -> Self {
        let defined = signal.dropna();
        let raw = defined.values();

        let mut shifted = vec![f64::NAN; raw.len()];
        if raw.len() > 1 {
            shifted[1..].copy_from_slice(&raw[..raw.len() - 1]);
        }

        if mean_center {
            let valid: Vec<f64> = shifted.iter().copied().filter(|v| !v.is_nan()).collect();
            if let Some(&pivot) = valid.first() {
                // Mean relative to a pivot: a constant series centers to exactly zero.
                let offset = valid.iter().map(|v| v - pivot).sum::<f64>() / valid.len() as f64;
                let mean = pivot + offset;
                for v in shifted.iter_mut() {
                    *v -= mean;
                }
            }
        }

        let magnitude: Vec<f64> = shifted.iter().map(|v| v.abs()).collect();
        let ma = rolling_mean(&magnitude, ma_window);

        let mut profile = Self {
            index: Vec::new(),
            signal: Vec::new(),
            long_open: Vec::new(),
            short_open: Vec::new(),
            long_close: Vec::new(),
            short_close: Vec::new(),
        };
        for (row, ts) in defined.index().iter().enumerate() {
            let (s, m) = (shifted[row], ma[row]);
            if s.is_nan() || m.is_nan() {
                continue;
            }
            // A mean of magnitudes is non-negative; the running sum can leave
            // residue below zero once the window is all zeros.
            let m = m.max(0.0);
            profile.index.push(*ts);
            profile.signal.push(s);
            profile.long_open.push(m * open_coef);
            profile.short_open.push(-m * open_coef);
            profile.long_close.push(-m * close_coef);
            profile.short_close.push(m * close_coef);
        }
        profile
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
