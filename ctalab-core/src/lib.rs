//! CTALab Core: signal-to-position conversion and trade accounting.
//!
//! This crate contains the algorithmic heart of the backtester:
//! - Domain types (time series, product panels, position events, OHLCV frames)
//! - Threshold state machine turning a raw signal into open/close events
//! - Multi-product flag building over a date window
//! - Condition-expression rules as an alternative event source
//! - Per-trade return calculator and portfolio return matrices
//! - Panel loading from CSV and Parquet

pub mod condition;
pub mod data;
pub mod domain;
pub mod error;
pub mod flags;
pub mod indicators;
pub mod threshold;
pub mod trade;

pub use domain::{
    Cell, DateRange, Flag, FlagSeries, FlagTable, OhlcvFrame, Panel, Product, Series, Timestamp,
};
pub use error::{CoreError, DataKind, MissingData};
pub use flags::{build_flags, FlagBuild, FlagRequest};
pub use threshold::{convert, LiquidityGate, ThresholdParams, Variant};
pub use trade::{aggregate, compute_returns, Aggregation, ReturnMatrices, TradeReturns};
