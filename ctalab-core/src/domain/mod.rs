//! Domain types: series, panels, position events, OHLCV frames, date windows.

pub mod flag;
pub mod ohlcv;
pub mod panel;
pub mod range;
pub mod series;

pub use flag::{Flag, FlagSeries, FlagTable};
pub use ohlcv::OhlcvFrame;
pub use panel::{Panel, Product};
pub use range::DateRange;
pub use series::{Cell, Series, Timestamp};
