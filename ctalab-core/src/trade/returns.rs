//! Per-trade return calculator.
//!
//! Walks one product's events in time order, keeping independent long and
//! short entry prices:
//! - `OpenLong` / `OpenShort` record (or overwrite) the entry price.
//! - `Close` realises every open side:
//!   long  = exit / entry - 1 - cost
//!   short = 1 - exit / entry - cost
//!
//! Returns exist only on close rows. Both sides may realise on one close;
//! neither built-in event generator produces that, but a precomputed event
//! table can.

use crate::domain::{Flag, FlagSeries, Series};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeReturns {
    pub long: Series<f64>,
    pub short: Series<f64>,
    /// Sum of the defined sides; undefined when both are.
    pub combined: Series<f64>,
}

/// Realised returns of one product.
///
/// Events and prices are inner-joined on timestamp; events without a price
/// row are dropped. An undefined entry or exit price yields an undefined
/// return. The output index is the joined event index.
pub fn compute_returns(flags: &FlagSeries, prices: &Series<f64>, cost: f64) -> TradeReturns {
    let mut index = Vec::new();
    let mut long = Vec::new();
    let mut short = Vec::new();

    let mut long_entry: Option<f64> = None;
    let mut short_entry: Option<f64> = None;

    for (ts, flag) in flags.iter() {
        let Some(flag) = flag else { continue };
        let Some(price) = prices.get(ts) else { continue };

        let mut long_ret = f64::NAN;
        let mut short_ret = f64::NAN;
        match flag {
            Flag::OpenLong => long_entry = Some(price),
            Flag::OpenShort => short_entry = Some(price),
            Flag::Close => {
                if let Some(entry) = long_entry.take() {
                    long_ret = (price / entry - 1.0) - cost;
                }
                if let Some(entry) = short_entry.take() {
                    short_ret = (1.0 - price / entry) - cost;
                }
            }
        }
        index.push(ts);
        long.push(long_ret);
        short.push(short_ret);
    }

    let combined: Vec<f64> = long
        .iter()
        .zip(&short)
        .map(|(&l, &s)| match (l.is_nan(), s.is_nan()) {
            (true, true) => f64::NAN,
            (false, true) => l,
            (true, false) => s,
            (false, false) => l + s,
        })
        .collect();

    TradeReturns {
        long: Series::from_pairs(index.iter().copied().zip(long)),
        short: Series::from_pairs(index.iter().copied().zip(short)),
        combined: Series::from_pairs(index.into_iter().zip(combined)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;
    use chrono::{Duration, NaiveDate};

    fn ts(i: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + Duration::hours(i)
    }

    fn flags(events: &[(i64, Option<Flag>)]) -> FlagSeries {
        Series::from_pairs(events.iter().map(|(i, f)| (ts(*i), *f)))
    }

    fn prices(values: &[f64]) -> Series<f64> {
        Series::from_pairs(values.iter().enumerate().map(|(i, v)| (ts(i as i64), *v)))
    }

    #[test]
    fn long_round_trip_with_cost() {
        let f = flags(&[(0, Some(Flag::OpenLong)), (1, Some(Flag::Close))]);
        let r = compute_returns(&f, &prices(&[100.0, 110.0]), 0.0002);
        assert!((r.long.get(ts(1)).unwrap() - 0.0998).abs() < 1e-12);
        assert!(r.long.get(ts(0)).unwrap().is_nan());
        assert!(r.short.values().iter().all(|v| v.is_nan()));
        assert!((r.combined.get(ts(1)).unwrap() - 0.0998).abs() < 1e-12);
        assert!(r.combined.get(ts(0)).unwrap().is_nan());
    }

    #[test]
    fn short_round_trip() {
        let f = flags(&[(0, Some(Flag::OpenShort)), (2, Some(Flag::Close))]);
        let r = compute_returns(&f, &prices(&[100.0, 95.0, 90.0]), 0.0);
        assert!((r.short.get(ts(2)).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(r.long.len(), 2);
    }

    #[test]
    fn reversal_close_realises_both_sides() {
        let f = flags(&[
            (0, Some(Flag::OpenLong)),
            (1, Some(Flag::OpenShort)),
            (2, Some(Flag::Close)),
        ]);
        let r = compute_returns(&f, &prices(&[100.0, 110.0, 121.0]), 0.0);
        let long = r.long.get(ts(2)).unwrap();
        let short = r.short.get(ts(2)).unwrap();
        assert!((long - 0.21).abs() < 1e-12);
        assert!((short + 0.1).abs() < 1e-12);
        assert!((r.combined.get(ts(2)).unwrap() - 0.11).abs() < 1e-12);
    }

    #[test]
    fn reopen_overwrites_entry() {
        let f = flags(&[
            (0, Some(Flag::OpenLong)),
            (1, Some(Flag::OpenLong)),
            (2, Some(Flag::Close)),
        ]);
        let r = compute_returns(&f, &prices(&[100.0, 200.0, 220.0]), 0.0);
        assert!((r.long.get(ts(2)).unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn close_without_open_is_undefined() {
        let f = flags(&[(0, Some(Flag::Close))]);
        let r = compute_returns(&f, &prices(&[100.0]), 0.0);
        assert!(r.combined.get(ts(0)).unwrap().is_nan());
    }

    #[test]
    fn events_without_price_rows_are_dropped() {
        let f = flags(&[(0, Some(Flag::OpenLong)), (5, Some(Flag::Close)), (6, None)]);
        let r = compute_returns(&f, &prices(&[100.0, 101.0]), 0.0);
        assert_eq!(r.long.len(), 1);
        assert_eq!(r.combined.defined_count(), 0);
    }

    #[test]
    fn nan_price_gives_undefined_return() {
        let f = flags(&[(0, Some(Flag::OpenLong)), (1, Some(Flag::Close))]);
        let r = compute_returns(&f, &prices(&[f64::NAN, 110.0]), 0.0);
        assert!(r.long.get(ts(1)).unwrap().is_nan());
    }
}
