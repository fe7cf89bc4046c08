//! Signal → position-event conversion.
//!
//! A raw signal is compared against dynamic thresholds derived from a
//! trailing mean of its own magnitude. Crossing the open line emits an open
//! event; the position is held until the signal crosses the (narrower)
//! close line on the opposite side, or the series ends.
//!
//! The four named variants are two switches on one engine: mean-centering
//! of the signal and a liquidity gate on entries.

pub mod machine;
pub mod params;
pub mod profile;
pub mod variant;

pub use machine::{convert, LiquidityGate};
pub use params::ThresholdParams;
pub use profile::ThresholdProfile;
pub use variant::Variant;
