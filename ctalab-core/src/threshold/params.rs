use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Numeric parameters of the threshold machine.
///
/// `ratio` scales the open coefficient only; the close coefficient is
/// applied as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParams {
    pub open_coef: f64,
    pub close_coef: f64,
    pub ma_window: usize,
    pub liquidity_threshold: f64,
    pub ratio: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            open_coef: 2.0,
            close_coef: 0.8,
            ma_window: 500,
            liquidity_threshold: 2e9,
            ratio: 1.0,
        }
    }
}

impl ThresholdParams {
    pub fn effective_open_coef(&self) -> f64 {
        self.open_coef * self.ratio
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.ma_window == 0 {
            return Err(CoreError::InvalidParameter("ma_window must be >= 1".into()));
        }
        for (name, value) in [
            ("open_coef", self.open_coef),
            ("close_coef", self.close_coef),
            ("liquidity_threshold", self.liquidity_threshold),
            ("ratio", self.ratio),
        ] {
            if !value.is_finite() {
                return Err(CoreError::InvalidParameter(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if self.effective_open_coef() <= 0.0 {
            return Err(CoreError::InvalidParameter(format!(
                "open_coef * ratio must be positive, got {}",
                self.effective_open_coef()
            )));
        }
        Ok(())
    }
}
