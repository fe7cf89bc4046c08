//! Condition-expression rules.
//!
//! Rules are plain data: a tagged tree of [`Value`] and [`Condition`] nodes
//! that serde can read from TOML or JSON. One interpreter evaluates a tree
//! over an OHLCV frame, and [`generate_flags`] turns four evaluated
//! conditions (buy, sell, exit long, exit short) into position events.

pub mod eval;
pub mod expr;
pub mod generate;

pub use eval::{evaluate, evaluate_value};
pub use expr::{Condition, Field, Value};
pub use generate::{generate_flag_table, generate_flags, RuleFlags, SignalRules};
