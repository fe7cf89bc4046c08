//! Realised trade returns, per product and across the portfolio.

pub mod portfolio;
pub mod returns;

pub use portfolio::{aggregate, flag_column, Aggregation, ReturnMatrices};
pub use returns::{compute_returns, TradeReturns};
