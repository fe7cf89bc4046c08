//! Inclusive calendar-day backtest window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::series::Timestamp;
use crate::error::CoreError;

/// `[start, end]` by calendar date. Intraday bars on `end` are inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidDateRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self, CoreError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
                CoreError::InvalidDateRange(format!("cannot parse '{s}' as YYYY-MM-DD: {e}"))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        let day = ts.date();
        day >= self.start && day <= self.end
    }
}
