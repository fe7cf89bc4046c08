//! Position events from condition rules.
//!
//! A three-state machine (flat, long, short) per product:
//! - flat:  buy opens long, else sell opens short
//! - long:  exit-long closes, else sell reverses to short
//! - short: exit-short closes, else buy reverses to long
//!
//! A reversal closes the held side on the signal bar and opens the new side
//! on the following bar. A position still held on the last bar is closed
//! there. Bars without a transition carry no event.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::eval::evaluate;
use super::expr::Condition;
use crate::domain::{Flag, FlagSeries, FlagTable, OhlcvFrame, Panel, Product, Series};
use crate::error::{DataKind, MissingData};

/// Entry and exit conditions. Absent conditions never fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRules {
    pub buy: Condition,
    #[serde(default)]
    pub sell: Option<Condition>,
    #[serde(default)]
    pub exit_long: Option<Condition>,
    #[serde(default)]
    pub exit_short: Option<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Flat,
    Long,
    Short,
    /// Closed on the previous bar; the opposite side opens on this one.
    Reversing(Flag),
}

pub fn generate_flags(rules: &SignalRules, frame: &OhlcvFrame) -> FlagSeries {
    let n = frame.len();
    let eval_opt = |c: &Option<Condition>| match c {
        Some(c) => evaluate(c, frame),
        None => vec![false; n],
    };
    let buy = evaluate(&rules.buy, frame);
    let sell = eval_opt(&rules.sell);
    let exit_long = eval_opt(&rules.exit_long);
    let exit_short = eval_opt(&rules.exit_short);

    let mut position = Position::Flat;
    let mut flags = Vec::with_capacity(n);
    for t in 0..n {
        let (event, next) = match position {
            Position::Flat if buy[t] => (Some(Flag::OpenLong), Position::Long),
            Position::Flat if sell[t] => (Some(Flag::OpenShort), Position::Short),
            Position::Long if exit_long[t] => (Some(Flag::Close), Position::Flat),
            Position::Long if sell[t] => (Some(Flag::Close), Position::Reversing(Flag::OpenShort)),
            Position::Short if exit_short[t] => (Some(Flag::Close), Position::Flat),
            Position::Short if buy[t] => (Some(Flag::Close), Position::Reversing(Flag::OpenLong)),
            Position::Reversing(Flag::OpenLong) => (Some(Flag::OpenLong), Position::Long),
            Position::Reversing(open) => (Some(open), Position::Short),
            held => (None, held),
        };
        flags.push(event);
        position = next;
    }
    if matches!(position, Position::Long | Position::Short) {
        if let Some(last) = flags.last_mut() {
            *last = Some(Flag::Close);
        }
    }

    Series::from_pairs(frame.index.iter().copied().zip(flags))
}

/// Rule-generated events for many products, plus skipped products.
#[derive(Debug, Clone, Default)]
pub struct RuleFlags {
    pub table: FlagTable,
    pub skipped: Vec<MissingData>,
}

pub fn generate_flag_table(
    rules: &SignalRules,
    frames: &BTreeMap<Product, OhlcvFrame>,
) -> RuleFlags {
    let (empty, usable): (Vec<_>, Vec<_>) = frames.iter().partition(|(_, f)| f.is_empty());

    let skipped: Vec<MissingData> = empty
        .into_iter()
        .map(|(product, _)| {
            let missing = MissingData::new(product.clone(), DataKind::Price);
            missing.warn_skipped();
            missing
        })
        .collect();

    let mut built: Vec<(Product, FlagSeries)> = usable
        .par_iter()
        .map(|(product, frame)| {
            let flags = generate_flags(rules, frame);
            debug!(product = %product, events = flags.defined_count(), "rule flags");
            ((*product).clone(), flags)
        })
        .collect();
    built.sort_by(|a, b| a.0.cmp(&b.0));

    RuleFlags {
        table: Panel::from_series(built),
        skipped,
    }
}
