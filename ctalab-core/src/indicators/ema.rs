//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: EMA at the first defined value equals that value (no SMA warmup).
//! Lookback: 0 after the first defined value.
//! NaN inputs produce NaN at that row; the recursion resumes from the last
//! defined EMA on the next defined value.

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev: Option<f64> = None;

    for (i, &x) in values.iter().enumerate() {
        if x.is_nan() {
            continue;
        }
        let next = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        result[i] = next;
        prev = Some(next);
    }

    result
}
