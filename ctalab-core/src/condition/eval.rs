//! Interpreter for [`Value`] and [`Condition`] trees.
//!
//! Every node evaluates to one column aligned with the frame's rows.
//! Comparisons touching NaN are false; `Not` negates that result, so
//! `Not(Above(NaN, x))` is true.

use super::expr::{Condition, Field, Value};
use crate::domain::OhlcvFrame;
use crate::indicators::{atr, bollinger, ema, macd, rolling_mean, rsi};

pub fn evaluate_value(value: &Value, frame: &OhlcvFrame) -> Vec<f64> {
    match value {
        Value::Field { field } => field_column(*field, frame).to_vec(),
        Value::Const { value } => vec![*value; frame.len()],
        Value::Sma { of, period } => rolling_mean(&evaluate_value(of, frame), *period),
        Value::Ema { of, period } => ema(&evaluate_value(of, frame), *period),
        Value::Rsi { period } => rsi(&frame.close, *period),
        Value::Macd {
            fast,
            slow,
            signal,
            line,
        } => macd(&frame.close, *fast, *slow, *signal, *line),
        Value::Bollinger {
            period,
            std_dev,
            band,
        } => bollinger(&frame.close, *period, *std_dev, *band),
        Value::Atr { period } => atr(&frame.high, &frame.low, &frame.close, *period),
    }
}

pub fn evaluate(condition: &Condition, frame: &OhlcvFrame) -> Vec<bool> {
    let n = frame.len();
    match condition {
        Condition::Above { left, right } => compare(left, right, frame, |a, b| a > b),
        Condition::Below { left, right } => compare(left, right, frame, |a, b| a < b),
        Condition::Equals { left, right } => compare(left, right, frame, |a, b| a == b),
        Condition::CrossedAbove { left, right } => {
            cross(left, right, frame, |pa, pb, a, b| pa <= pb && a > b)
        }
        Condition::CrossedBelow { left, right } => {
            cross(left, right, frame, |pa, pb, a, b| pa >= pb && a < b)
        }
        Condition::Increasing { of, periods } => trend(of, *periods, frame, |d| d > 0.0),
        Condition::Decreasing { of, periods } => trend(of, *periods, frame, |d| d < 0.0),
        Condition::And { all } => combine(all, n, frame, |a, b| a && b),
        Condition::Or { any } => combine(any, n, frame, |a, b| a || b),
        Condition::Not { inner } => evaluate(inner, frame).into_iter().map(|b| !b).collect(),
    }
}

fn field_column(field: Field, frame: &OhlcvFrame) -> &[f64] {
    match field {
        Field::Open => &frame.open,
        Field::High => &frame.high,
        Field::Low => &frame.low,
        Field::Close => &frame.close,
        Field::Volume => &frame.volume,
    }
}

fn compare(left: &Value, right: &Value, frame: &OhlcvFrame, op: fn(f64, f64) -> bool) -> Vec<bool> {
    let a = evaluate_value(left, frame);
    let b = evaluate_value(right, frame);
    a.iter().zip(&b).map(|(&x, &y)| op(x, y)).collect()
}

fn cross(
    left: &Value,
    right: &Value,
    frame: &OhlcvFrame,
    op: fn(f64, f64, f64, f64) -> bool,
) -> Vec<bool> {
    let a = evaluate_value(left, frame);
    let b = evaluate_value(right, frame);
    (0..a.len())
        .map(|t| t > 0 && op(a[t - 1], b[t - 1], a[t], b[t]))
        .collect()
}

fn trend(of: &Value, periods: usize, frame: &OhlcvFrame, op: fn(f64) -> bool) -> Vec<bool> {
    let v = evaluate_value(of, frame);
    (0..v.len())
        .map(|t| t >= periods && periods > 0 && op(v[t] - v[t - periods]))
        .collect()
}

/// Empty lists evaluate to all-false.
fn combine(
    parts: &[Condition],
    n: usize,
    frame: &OhlcvFrame,
    op: fn(bool, bool) -> bool,
) -> Vec<bool> {
    let mut results = parts.iter().map(|c| evaluate(c, frame));
    let Some(first) = results.next() else {
        return vec![false; n];
    };
    results.fold(first, |acc, next| {
        acc.into_iter().zip(next).map(|(a, b)| op(a, b)).collect()
    })
}
