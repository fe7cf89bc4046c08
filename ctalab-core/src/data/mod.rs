//! Panel loading from CSV and Parquet files.

pub mod loader;
pub mod timestamp;

pub use loader::{load_ohlcv, load_panel};
pub use timestamp::parse_timestamp;

/// Failures reading an input file. Always fatal for the file concerned.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unsupported file format: {0} (expected .csv or .parquet)")]
    UnsupportedFormat(String),

    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: String, column: String },

    #[error("{path}: unparseable timestamp '{value}'")]
    BadTimestamp { path: String, value: String },

    #[error("{path}: no rows")]
    Empty { path: String },
}
