//! Position events.
//!
//! A flag series is sparse: most rows carry no event. It is not a position
//! indicator; holding is implied between an open and its close.

use serde::{Deserialize, Serialize};

use super::panel::Panel;
use super::series::Series;

/// Discrete open/close marker. Numeric encoding: +1 / -1 / 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    OpenLong,
    OpenShort,
    Close,
}

impl Flag {
    pub fn code(self) -> i8 {
        match self {
            Flag::OpenLong => 1,
            Flag::OpenShort => -1,
            Flag::Close => 0,
        }
    }

    /// Decode a numeric cell. NaN and any other value are "no event".
    pub fn from_code(value: f64) -> Option<Flag> {
        if value == 1.0 {
            Some(Flag::OpenLong)
        } else if value == -1.0 {
            Some(Flag::OpenShort)
        } else if value == 0.0 {
            Some(Flag::Close)
        } else {
            None
        }
    }
}

pub type FlagSeries = Series<Option<Flag>>;

pub type FlagTable = Panel<Option<Flag>>;

impl FlagTable {
    /// Decode a numeric panel (+1/-1/0/NaN) into events.
    pub fn from_codes(codes: &Panel<f64>) -> Self {
        Panel::from_series_on(
            codes.index(),
            codes
                .products()
                .filter_map(|p| codes.column(p).map(|s| (p.to_string(), s.map(Flag::from_code)))),
        )
    }
}
