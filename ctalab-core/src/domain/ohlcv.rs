//! OHLCV frame — the tabular context condition rules are evaluated over.

use serde::{Deserialize, Serialize};

use super::series::Timestamp;
use crate::error::CoreError;

/// Column-oriented OHLCV bars for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvFrame {
    pub index: Vec<Timestamp>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl OhlcvFrame {
    pub fn new(
        index: Vec<Timestamp>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self, CoreError> {
        let n = index.len();
        for (name, col) in [
            ("open", &open),
            ("high", &high),
            ("low", &low),
            ("close", &close),
            ("volume", &volume),
        ] {
            if col.len() != n {
                return Err(CoreError::InvalidSeries(format!(
                    "column '{name}' has {} rows, index has {n}",
                    col.len()
                )));
            }
        }
        if index.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CoreError::InvalidSeries(
                "OHLCV index not strictly ascending".into(),
            ));
        }
        Ok(Self {
            index,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Frame where open/high/low equal close and volume is zero.
    /// Enough for rules that only look at closes.
    pub fn from_closes(index: Vec<Timestamp>, close: Vec<f64>) -> Result<Self, CoreError> {
        let zeros = vec![0.0; close.len()];
        Self::new(index, close.clone(), close.clone(), close.clone(), close, zeros)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
