//! Wide-table readers.
//!
//! A wide table has one timestamp column (named `datetime`, `timestamp` or
//! `date`, otherwise the first column) and one numeric column per product.
//! Rows are sorted on load; duplicate timestamps keep the last row. Nulls
//! and non-numeric cells become NaN.

use polars::prelude::*;
use std::path::Path;
use tracing::debug;

use super::timestamp::parse_timestamp;
use super::LoadError;
use crate::domain::{OhlcvFrame, Panel, Series, Timestamp};

const TIME_COLUMNS: &[&str] = &["datetime", "timestamp", "date"];

/// Read a CSV or Parquet file into a product panel.
pub fn load_panel(path: &Path) -> Result<Panel<f64>, LoadError> {
    let df = read_frame(path)?;
    let time_col = time_column_name(&df, path)?;
    let index = read_timestamps(&df, &time_col, path)?;

    let mut series = Vec::new();
    for column in df.get_columns() {
        let name = column.name().to_string();
        if name == time_col {
            continue;
        }
        let values = read_f64(column, path)?;
        series.push((name, Series::from_pairs(index.iter().copied().zip(values))));
    }

    let panel = Panel::from_series(series);
    debug!(
        path = %path.display(),
        rows = panel.height(),
        products = panel.width(),
        "loaded panel"
    );
    Ok(panel)
}

/// Read one product's OHLCV bars. `volume` is optional (zero when absent).
pub fn load_ohlcv(path: &Path) -> Result<OhlcvFrame, LoadError> {
    let df = read_frame(path)?;
    let time_col = time_column_name(&df, path)?;
    let index = read_timestamps(&df, &time_col, path)?;

    let field = |name: &str| -> Result<Vec<f64>, LoadError> {
        let column = df.column(name).map_err(|_| LoadError::MissingColumn {
            path: path.display().to_string(),
            column: name.to_string(),
        })?;
        read_f64(column, path)
    };
    let open = field("open")?;
    let high = field("high")?;
    let low = field("low")?;
    let close = field("close")?;
    let volume = match df.column("volume") {
        Ok(column) => read_f64(column, path)?,
        Err(_) => vec![0.0; index.len()],
    };

    // Sort by timestamp, last duplicate wins.
    let rows = Series::from_pairs(
        index
            .into_iter()
            .zip(0..open.len())
            .map(|(ts, row)| (ts, Some(row))),
    );
    let pick = |col: &[f64]| -> Vec<f64> {
        rows.values()
            .iter()
            .map(|row| row.map_or(f64::NAN, |r| col[r]))
            .collect()
    };

    OhlcvFrame::new(
        rows.index().to_vec(),
        pick(&open),
        pick(&high),
        pick(&low),
        pick(&close),
        pick(&volume),
    )
    .map_err(|e| LoadError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn read_frame(path: &Path) -> Result<DataFrame, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let read_err = |e: PolarsError| LoadError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let lazy = match ext.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_has_header(true)
            .finish()
            .map_err(read_err)?,
        "parquet" | "pq" => LazyFrame::scan_parquet(path, Default::default()).map_err(read_err)?,
        _ => return Err(LoadError::UnsupportedFormat(path.display().to_string())),
    };

    let df = lazy.collect().map_err(read_err)?;
    if df.height() == 0 {
        return Err(LoadError::Empty {
            path: path.display().to_string(),
        });
    }
    Ok(df)
}

fn time_column_name(df: &DataFrame, path: &Path) -> Result<String, LoadError> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    for candidate in TIME_COLUMNS {
        if let Some(name) = names.iter().find(|n| n.eq_ignore_ascii_case(candidate)) {
            return Ok(name.clone());
        }
    }
    names.into_iter().next().ok_or_else(|| LoadError::MissingColumn {
        path: path.display().to_string(),
        column: "datetime".into(),
    })
}

/// Timestamps go through a string cast so Date, Datetime and text columns
/// share one parser.
fn read_timestamps(df: &DataFrame, name: &str, path: &Path) -> Result<Vec<Timestamp>, LoadError> {
    let read_err = |e: PolarsError| LoadError::Read {
        path: path.display().to_string(),
        message: format!("timestamp column '{name}': {e}"),
    };
    let column = df.column(name).map_err(read_err)?;
    let as_text = column.cast(&DataType::String).map_err(read_err)?;
    let text = as_text.str().map_err(read_err)?;

    text.into_iter()
        .map(|cell| {
            let raw = cell.unwrap_or_default();
            parse_timestamp(raw).ok_or_else(|| LoadError::BadTimestamp {
                path: path.display().to_string(),
                value: raw.to_string(),
            })
        })
        .collect()
}

fn read_f64(column: &Column, path: &Path) -> Result<Vec<f64>, LoadError> {
    let read_err = |e: PolarsError| LoadError::Read {
        path: path.display().to_string(),
        message: format!("column '{}': {e}", column.name()),
    };
    let cast = column.cast(&DataType::Float64).map_err(read_err)?;
    let values = cast.f64().map_err(read_err)?;
    Ok(values
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}
