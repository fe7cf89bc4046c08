use serde::{Deserialize, Serialize};

use crate::indicators::{BollingerBand, MacdLine};

/// OHLCV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

/// A numeric column derived from the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Field {
        field: Field,
    },
    Const {
        value: f64,
    },
    Sma {
        of: Box<Value>,
        period: usize,
    },
    Ema {
        of: Box<Value>,
        period: usize,
    },
    /// RSI of the close.
    Rsi {
        period: usize,
    },
    /// MACD of the close.
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
        line: MacdLine,
    },
    /// Bollinger band of the close.
    Bollinger {
        period: usize,
        std_dev: f64,
        band: BollingerBand,
    },
    Atr {
        period: usize,
    },
}

/// A boolean column derived from the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Above { left: Value, right: Value },
    Below { left: Value, right: Value },
    Equals { left: Value, right: Value },
    /// Previous bar at or below, current bar strictly above.
    CrossedAbove { left: Value, right: Value },
    /// Previous bar at or above, current bar strictly below.
    CrossedBelow { left: Value, right: Value },
    Increasing { of: Value, periods: usize },
    Decreasing { of: Value, periods: usize },
    And { all: Vec<Condition> },
    Or { any: Vec<Condition> },
    Not { inner: Box<Condition> },
}

impl Value {
    pub fn field(field: Field) -> Self {
        Value::Field { field }
    }

    pub fn close() -> Self {
        Value::field(Field::Close)
    }

    pub fn constant(value: f64) -> Self {
        Value::Const { value }
    }

    pub fn sma(self, period: usize) -> Self {
        Value::Sma {
            of: Box::new(self),
            period,
        }
    }

    pub fn ema(self, period: usize) -> Self {
        Value::Ema {
            of: Box::new(self),
            period,
        }
    }

    pub fn above(self, other: Value) -> Condition {
        Condition::Above {
            left: self,
            right: other,
        }
    }

    pub fn below(self, other: Value) -> Condition {
        Condition::Below {
            left: self,
            right: other,
        }
    }

    pub fn crossed_above(self, other: Value) -> Condition {
        Condition::CrossedAbove {
            left: self,
            right: other,
        }
    }

    pub fn crossed_below(self, other: Value) -> Condition {
        Condition::CrossedBelow {
            left: self,
            right: other,
        }
    }

    pub fn increasing(self, periods: usize) -> Condition {
        Condition::Increasing { of: self, periods }
    }

    pub fn decreasing(self, periods: usize) -> Condition {
        Condition::Decreasing { of: self, periods }
    }
}

impl Condition {
    pub fn and(self, other: Condition) -> Condition {
        match self {
            Condition::And { mut all } => {
                all.push(other);
                Condition::And { all }
            }
            first => Condition::And {
                all: vec![first, other],
            },
        }
    }

    pub fn or(self, other: Condition) -> Condition {
        match self {
            Condition::Or { mut any } => {
                any.push(other);
                Condition::Or { any }
            }
            first => Condition::Or {
                any: vec![first, other],
            },
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Condition {
        Condition::Not {
            inner: Box::new(self),
        }
    }
}
