//! Artifact export: CSV tables and JSON records for a reported run.
//!
//! Undefined cells are written as empty fields. Every persisted manifest
//! carries a `schema_version`; newer versions are rejected on load.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ctalab_core::{FlagTable, MissingData, Panel, Product, Timestamp};

use crate::backtest::{FitConfig, FittedBacktest};
use crate::folds::FoldTable;
use crate::metrics::{PnlCurve, Scorecard};

pub const SCHEMA_VERSION: u32 = 1;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Run summary written as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub run_id: String,
    pub config: FitConfig,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    /// Products dropped while building events.
    pub fit_skipped: Vec<MissingData>,
    /// Products dropped while computing returns.
    pub report_skipped: Vec<MissingData>,
    pub scorecard: Option<Scorecard>,
    pub product_scorecards: BTreeMap<Product, Scorecard>,
}

/// Provenance of the loaded inputs.
#[derive(Debug, Clone, Default)]
pub struct DataProvenance {
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl RunManifest {
    pub fn new(fitted: &FittedBacktest, provenance: &DataProvenance) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: fitted.run_id.clone(),
            config: fitted.config.clone(),
            dataset_hash: provenance.dataset_hash.clone(),
            has_synthetic: provenance.has_synthetic,
            fit_skipped: fitted.skipped.clone(),
            report_skipped: fitted
                .report
                .as_ref()
                .map(|r| r.skipped.clone())
                .unwrap_or_default(),
            scorecard: fitted.report.as_ref().map(|r| r.scorecard),
            product_scorecards: fitted
                .product_reports
                .iter()
                .map(|(p, r)| (p.clone(), r.scorecard))
                .collect(),
        }
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_manifest_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize run manifest to JSON")
}

pub fn import_manifest_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize run manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

pub fn export_scorecard_json(scorecard: &Scorecard) -> Result<String> {
    serde_json::to_string_pretty(scorecard).context("failed to serialize scorecard to JSON")
}

// ─── CSV ────────────────────────────────────────────────────────────

fn cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(cell).unwrap_or_default()
}

fn timestamp(ts: &Timestamp) -> String {
    ts.format(TIME_FORMAT).to_string()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Event table as `datetime,<products...>` with codes +1 / -1 / 0.
pub fn export_flags_csv(flags: &FlagTable) -> Result<String> {
    let products: Vec<&str> = flags.products().collect();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(std::iter::once("datetime").chain(products.iter().copied()))?;
    for (row, ts) in flags.index().iter().enumerate() {
        let mut record = vec![timestamp(ts)];
        for product in &products {
            let code = flags
                .cells(product)
                .and_then(|cells| cells[row])
                .map(|f| f.code().to_string())
                .unwrap_or_default();
            record.push(code);
        }
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Numeric panel as `datetime,<products...>`.
pub fn export_panel_csv(panel: &Panel<f64>) -> Result<String> {
    let products: Vec<&str> = panel.products().collect();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(std::iter::once("datetime").chain(products.iter().copied()))?;
    for (row, ts) in panel.index().iter().enumerate() {
        let mut record = vec![timestamp(ts)];
        for product in &products {
            let value = panel.cells(product).map_or(f64::NAN, |cells| cells[row]);
            record.push(cell(value));
        }
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

pub fn export_pnl_csv(pnl: &PnlCurve) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["datetime", "all", "long", "short"])?;
    for (i, ts) in pnl.index.iter().enumerate() {
        let at = |track: &[f64]| optional(track.get(i).copied());
        wtr.write_record([timestamp(ts), at(&pnl.all), at(&pnl.long), at(&pnl.short)])?;
    }
    finish(wtr)
}

pub fn export_folds_csv(folds: &FoldTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["fold", "all", "long", "short"])?;
    for row in &folds.rows {
        wtr.write_record([
            row.fold.to_string(),
            optional(row.all),
            optional(row.long),
            optional(row.short),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

fn write(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Save every artifact of a fitted run under `output_dir/{name}_{run id prefix}/`:
/// - `manifest.json`: configuration, provenance, skipped products, scorecards
/// - `flags.csv`: the event table
/// - `returns_all.csv`, `returns_long.csv`, `returns_short.csv`, `pnl.csv`,
///   `folds.csv`, `scorecard.json` once `report` has run
/// - `products/<PRODUCT>_pnl.csv` for each per-product report
///
/// Returns the run directory.
pub fn save_artifacts(
    fitted: &FittedBacktest,
    provenance: &DataProvenance,
    output_dir: &Path,
) -> Result<PathBuf> {
    let short_id: String = fitted.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{short_id}", fitted.config.name));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let manifest = RunManifest::new(fitted, provenance);
    write(&run_dir, "manifest.json", &export_manifest_json(&manifest)?)?;
    write(&run_dir, "flags.csv", &export_flags_csv(&fitted.flags)?)?;

    if let Some(report) = &fitted.report {
        write(&run_dir, "returns_all.csv", &export_panel_csv(&report.returns.all)?)?;
        write(&run_dir, "returns_long.csv", &export_panel_csv(&report.returns.long)?)?;
        write(&run_dir, "returns_short.csv", &export_panel_csv(&report.returns.short)?)?;
        write(&run_dir, "pnl.csv", &export_pnl_csv(&report.pnl)?)?;
        write(&run_dir, "folds.csv", &export_folds_csv(&report.folds)?)?;
        write(&run_dir, "scorecard.json", &export_scorecard_json(&report.scorecard)?)?;
    }

    if !fitted.product_reports.is_empty() {
        let products_dir = run_dir.join("products");
        std::fs::create_dir_all(&products_dir)
            .with_context(|| format!("failed to create {}", products_dir.display()))?;
        for (product, report) in &fitted.product_reports {
            write(&products_dir, &format!("{product}_pnl.csv"), &export_pnl_csv(&report.pnl)?)?;
        }
    }

    Ok(run_dir)
}

pub fn load_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest_json(&json)
}
