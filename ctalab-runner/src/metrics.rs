//! Return statistics over the portfolio return matrices.
//!
//! Every statistic is computed over the defined cells of a matrix (one cell
//! is one closed trade), not over the time axis. A statistic whose
//! denominator is zero is `None` rather than NaN or infinity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use ctalab_core::{Panel, ReturnMatrices, Timestamp};

/// Statistics of one track (all / long / short).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackMetrics {
    /// Share of trades with a strictly positive return.
    pub win_rate: Option<f64>,
    /// Sum of gains over the absolute sum of losses.
    pub profit_loss_ratio: Option<f64>,
    pub mean_return: Option<f64>,
    pub trade_count: usize,
    pub trade_count_per_day: Option<f64>,
    /// Final value of the cumulative curve.
    pub total_profit: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    pub all: TrackMetrics,
    pub long: TrackMetrics,
    pub short: TrackMetrics,
}

/// Running sum of the cross-sectional row sums, one value per axis row.
/// Rows without any trade add zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PnlCurve {
    pub index: Vec<Timestamp>,
    pub all: Vec<f64>,
    pub long: Vec<f64>,
    pub short: Vec<f64>,
}

impl PnlCurve {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

pub fn win_rate(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let wins = returns.iter().filter(|r| **r > 0.0).count();
    Some(wins as f64 / returns.len() as f64)
}

pub fn profit_loss_ratio(returns: &[f64]) -> Option<f64> {
    let gains: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let losses: f64 = returns.iter().filter(|r| **r < 0.0).sum();
    if losses == 0.0 {
        return None;
    }
    Some(gains / losses.abs())
}

pub fn mean_return(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    Some(returns.iter().sum::<f64>() / returns.len() as f64)
}

/// Distinct calendar days on an axis.
pub fn trading_days(index: &[Timestamp]) -> usize {
    index.iter().map(|ts| ts.date()).collect::<BTreeSet<_>>().len()
}

pub fn cumulative(matrix: &Panel<f64>) -> Vec<f64> {
    let mut running = 0.0;
    matrix
        .row_sums()
        .values()
        .iter()
        .map(|v| {
            if !v.is_nan() {
                running += v;
            }
            running
        })
        .collect()
}

pub fn pnl_curve(matrices: &ReturnMatrices) -> PnlCurve {
    PnlCurve {
        index: matrices.all.index().to_vec(),
        all: cumulative(&matrices.all),
        long: cumulative(&matrices.long),
        short: cumulative(&matrices.short),
    }
}

fn track(matrix: &Panel<f64>, curve: &[f64], days: usize) -> TrackMetrics {
    let returns: Vec<f64> = matrix.all_cells().filter(|v| !v.is_nan()).collect();
    let trade_count = returns.len();
    TrackMetrics {
        win_rate: win_rate(&returns),
        profit_loss_ratio: profit_loss_ratio(&returns),
        mean_return: mean_return(&returns),
        trade_count,
        trade_count_per_day: (days > 0).then(|| trade_count as f64 / days as f64),
        total_profit: curve.last().copied(),
    }
}

/// Cumulative curve and per-track statistics.
///
/// The day count for every track comes from the combined matrix's axis so
/// that long and short trades-per-day are comparable.
pub fn compute_metrics(matrices: &ReturnMatrices) -> (PnlCurve, Scorecard) {
    let curve = pnl_curve(matrices);
    let days = trading_days(matrices.all.index());
    let scorecard = Scorecard {
        all: track(&matrices.all, &curve.all, days),
        long: track(&matrices.long, &curve.long, days),
        short: track(&matrices.short, &curve.short, days),
    };
    (curve, scorecard)
}
