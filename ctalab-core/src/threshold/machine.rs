//! The forward-scanning state machine.
//!
//! One cursor walks the profile. At an unconsumed row the machine checks
//! the long entry, then the short entry. On entry it scans forward from the
//! same row for the first close crossing, marks both rows, and resumes at
//! the row after the close. Scans never overlap, so a product is processed
//! in linear time and holds at most one position.
//!
//! The cursor starts at row 0, so the first post-warm-up row may already
//! open. Implementations that seed the last close at row 0 and skip rows up
//! to it never enter there; this one does.
//!
//! The scan for a product is inherently sequential: where one trade closes
//! decides where the next may open.

use tracing::trace;

use super::params::ThresholdParams;
use super::profile::ThresholdProfile;
use crate::domain::{Flag, FlagSeries, Series};
use crate::error::CoreError;

/// Entry filter: a new position may open only where liquidity exceeds
/// `threshold`. Liquidity is looked up by timestamp; a missing value fails.
#[derive(Debug, Clone, Copy)]
pub struct LiquidityGate<'a> {
    pub series: &'a Series<f64>,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Long,
    Short,
}

/// Convert one product's signal into a sparse event series.
///
/// The output index is the post-warm-up profile index; rows without an
/// event carry `None`.
pub fn convert(
    signal: &Series<f64>,
    params: &ThresholdParams,
    mean_center: bool,
    gate: Option<LiquidityGate<'_>>,
) -> Result<FlagSeries, CoreError> {
    params.validate()?;
    let profile = ThresholdProfile::build(
        signal,
        params.ma_window,
        params.effective_open_coef(),
        params.close_coef,
        mean_center,
    );
    let allowed = match gate {
        Some(gate) => gate
            .series
            .reindex(&profile.index)
            .into_iter()
            .map(|liq| liq > gate.threshold)
            .collect(),
        None => vec![true; profile.len()],
    };
    let flags = scan(&profile, &allowed);
    Series::new(profile.index, flags)
}

/// Run the cursor over a built profile. `allowed[i]` gates entries at row i.
pub(crate) fn scan(profile: &ThresholdProfile, allowed: &[bool]) -> Vec<Option<Flag>> {
    let n = profile.len();
    let s = &profile.signal;
    let mut flags = vec![None; n];
    let mut cursor = 0;

    while cursor < n {
        let i = cursor;
        let side = if s[i] > profile.long_open[i] && allowed[i] {
            Some(Side::Long)
        } else if s[i] < profile.short_open[i] && allowed[i] {
            Some(Side::Short)
        } else {
            None
        };

        let Some(side) = side else {
            cursor += 1;
            continue;
        };

        let crossed = |j: usize| match side {
            Side::Long => s[j] < profile.long_close[j],
            Side::Short => s[j] > profile.short_close[j],
        };
        // Unmatched positions are force-closed on the last row.
        let close = (i..n).find(|&j| crossed(j)).unwrap_or(n - 1);

        flags[i] = Some(match side {
            Side::Long => Flag::OpenLong,
            Side::Short => Flag::OpenShort,
        });
        // An entry on the last row is closed on that same row.
        flags[close] = Some(Flag::Close);
        trace!(open = i, close, ?side, "round trip");

        cursor = close + 1;
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn flat_profile(signal: &[f64], ma: f64) -> ThresholdProfile {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let n = signal.len();
        ThresholdProfile {
            index: (0..n).map(|i| start + Duration::minutes(i as i64)).collect(),
            signal: signal.to_vec(),
            long_open: vec![ma * 2.0; n],
            short_open: vec![-ma * 2.0; n],
            long_close: vec![-ma * 0.8; n],
            short_close: vec![ma * 0.8; n],
        }
    }

    fn series(values: &[f64]) -> Series<f64> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Series::from_pairs(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + Duration::minutes(i as i64), *v)),
        )
    }

    #[test]
    fn opens_above_line_and_closes_below_close_line() {
        // baseline 0.2: open above 0.4, close below -0.16
        let signal = [0.1, 0.3, 2.5, 2.6, 0.2, 0.1, -0.2, 0.0];
        let flags = scan(&flat_profile(&signal, 0.2), &[true; 8]);
        assert_eq!(flags[2], Some(Flag::OpenLong));
        assert_eq!(flags[6], Some(Flag::Close));
        assert_eq!(flags.iter().filter(|f| f.is_some()).count(), 2);
    }

    #[test]
    fn short_entry_is_symmetric() {
        let signal = [0.0, -0.5, -0.1, 0.17, 0.0];
        let flags = scan(&flat_profile(&signal, 0.2), &[true; 5]);
        assert_eq!(flags[1], Some(Flag::OpenShort));
        assert_eq!(flags[3], Some(Flag::Close));
    }

    #[test]
    fn unmatched_position_is_force_closed() {
        let signal = [0.0, 0.5, 0.3, 0.1];
        let flags = scan(&flat_profile(&signal, 0.2), &[true; 4]);
        assert_eq!(flags[1], Some(Flag::OpenLong));
        assert_eq!(flags[3], Some(Flag::Close));
    }

    #[test]
    fn entry_on_last_row_collapses_to_close() {
        let signal = [0.0, 0.0, 0.5];
        let flags = scan(&flat_profile(&signal, 0.2), &[true; 3]);
        assert_eq!(flags, vec![None, None, Some(Flag::Close)]);
    }

    #[test]
    fn no_reentry_on_close_row() {
        // row 2 closes the long and would also qualify as a short entry
        let signal = [0.5, 0.0, -0.5, 0.0, 0.0];
        let flags = scan(&flat_profile(&signal, 0.2), &[true; 5]);
        assert_eq!(flags[0], Some(Flag::OpenLong));
        assert_eq!(flags[2], Some(Flag::Close));
        assert_eq!(flags[3], None);
    }

    #[test]
    fn first_row_is_eligible() {
        let signal = [0.5, -0.2];
        let flags = scan(&flat_profile(&signal, 0.2), &[true; 2]);
        assert_eq!(flags, vec![Some(Flag::OpenLong), Some(Flag::Close)]);
    }

    #[test]
    fn gate_blocks_entries_only() {
        let signal = [0.5, 0.0, 0.5, -0.2];
        let flags = scan(&flat_profile(&signal, 0.2), &[false, true, true, false]);
        assert_eq!(flags[0], None);
        assert_eq!(flags[2], Some(Flag::OpenLong));
        // the close row is gated off but closes still fire
        assert_eq!(flags[3], Some(Flag::Close));
    }

    #[test]
    fn convert_shifts_and_drops_warmup() {
        let params = ThresholdParams {
            ma_window: 2,
            ..Default::default()
        };
        // shifted: [NaN, 1, 1, 1, 9, 1, -5]; ma(2) defined from row 2
        let signal = series(&[1.0, 1.0, 1.0, 9.0, 1.0, -5.0, 0.0]);
        let flags = convert(&signal, &params, false, None).unwrap();
        assert_eq!(flags.len(), 5);
        // row with shifted 9: ma = 5, open line 10, so no entry
        assert!(flags.values().iter().all(|f| f.is_none()));
    }

    #[test]
    fn convert_emits_on_the_bar_after_the_signal() {
        let params = ThresholdParams {
            ma_window: 3,
            ..Default::default()
        };
        let signal = series(&[0.1, 0.1, 0.1, 0.1, 1.0, 0.1, -1.0, 0.1]);
        let flags = convert(&signal, &params, false, None).unwrap();
        // 1.0 is observed at row 4 and acted on at row 5
        let idx = signal.index();
        assert_eq!(flags.get(idx[5]), Some(Some(Flag::OpenLong)));
        assert_eq!(flags.get(idx[7]), Some(Some(Flag::Close)));
    }

    #[test]
    fn convert_with_missing_liquidity_never_opens() {
        let params = ThresholdParams {
            ma_window: 3,
            liquidity_threshold: 100.0,
            ..Default::default()
        };
        let signal = series(&[0.1, 0.1, 0.1, 0.1, 1.0, 0.1, -1.0, 0.1]);
        let liquidity = Series::empty();
        let gate = LiquidityGate {
            series: &liquidity,
            threshold: params.liquidity_threshold,
        };
        let flags = convert(&signal, &params, false, Some(gate)).unwrap();
        assert_eq!(flags.defined_count(), 0);
    }

    #[test]
    fn flat_zero_tail_emits_no_events() {
        let params = ThresholdParams {
            ma_window: 3,
            ..Default::default()
        };
        let mut values = vec![-0.524, 0.088, -0.260, 0.208, 0.251, -0.869, -0.974];
        values.extend([0.0; 10]);
        let flags = convert(&series(&values), &params, false, None).unwrap();
        assert_eq!(flags.defined_count(), 0);
    }

    #[test]
    fn convert_rejects_invalid_params() {
        let params = ThresholdParams {
            ma_window: 0,
            ..Default::default()
        };
        assert!(convert(&series(&[1.0, 2.0]), &params, false, None).is_err());
    }

    #[test]
    fn constant_signal_mean_centered_never_opens() {
        let params = ThresholdParams {
            ma_window: 5,
            ratio: 0.1,
            ..Default::default()
        };
        let signal = series(&[0.3; 40]);
        let centered = convert(&signal, &params, true, None).unwrap();
        assert_eq!(centered.defined_count(), 0);
        // plain: 0.3 > 0.2 * 0.3 opens immediately
        let plain = convert(&signal, &params, false, None).unwrap();
        assert!(plain.defined_count() > 0);
    }
}
