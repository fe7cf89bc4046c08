//! Error types shared across the core crate.
//!
//! Two families:
//! - [`CoreError`]: fatal. Bad configuration (unknown variant, inverted date
//!   range, invalid threshold parameters) aborts the whole run.
//! - [`MissingData`]: recoverable. A product with absent signal, liquidity,
//!   price or flag data is skipped and reported; the batch continues.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::data::LoadError;

/// Fatal errors from the core pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(
        "unsupported variant '{0}' (expected one of: plain, mean_centered, plain_liquidity, mean_centered_liquidity)"
    )]
    UnsupportedVariant(String),

    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid series: {0}")]
    InvalidSeries(String),

    #[error("variant '{0}' requires a liquidity table but none was supplied")]
    MissingLiquidityTable(String),

    #[error("load error: {0}")]
    Load(#[from] LoadError),
}

/// Which input a skipped product was missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Signal,
    Liquidity,
    Price,
    Flag,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Signal => "signal",
            DataKind::Liquidity => "liquidity",
            DataKind::Price => "price",
            DataKind::Flag => "flag",
        };
        f.write_str(name)
    }
}

/// A product was skipped because one of its inputs is absent.
///
/// Never aborts a batch. Callers collect these alongside their results and
/// the pipeline emits a `tracing` warning for each one.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} data missing for product '{product}'")]
pub struct MissingData {
    pub product: String,
    pub kind: DataKind,
}

impl MissingData {
    pub fn new(product: impl Into<String>, kind: DataKind) -> Self {
        Self {
            product: product.into(),
            kind,
        }
    }

    /// Emit the skip warning for this product.
    pub fn warn_skipped(&self) {
        warn!(
            product = %self.product,
            kind = %self.kind,
            "skipping product: {self}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_message_names_product_and_kind() {
        let err = MissingData::new("RB", DataKind::Liquidity);
        assert_eq!(err.to_string(), "liquidity data missing for product 'RB'");
    }

    #[test]
    fn unsupported_variant_lists_valid_names() {
        let msg = CoreError::UnsupportedVariant("bogus".into()).to_string();
        assert!(msg.contains("bogus"));
        assert!(msg.contains("mean_centered_liquidity"));
    }
}
