//! CTALab CLI: run and inspect commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save artifacts
//! - `inspect`: validate a config and summarise the inputs it resolves to

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use ctalab_core::Panel;
use ctalab_runner::export::{export_scorecard_json, save_artifacts};
use ctalab_runner::{
    load_inputs, run_from_config, BacktestConfig, LoadOptions, RunOptions, Scorecard, TrackMetrics,
};

#[derive(Parser)]
#[command(name = "ctalab", about = "CTALab CLI: signal-threshold futures backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Generate synthetic inputs instead of reading [data].
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Bars per session for synthetic inputs.
        #[arg(long, default_value_t = 4)]
        bars_per_day: usize,

        /// Also report each product on its own.
        #[arg(long, default_value_t = false)]
        by_product: bool,

        /// Print the scorecard as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Validate a config and summarise its inputs without running.
    Inspect {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Summarise synthetic inputs instead of reading [data].
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            synthetic,
            bars_per_day,
            by_product,
            json,
            output_dir,
        } => {
            let opts = RunOptions {
                load: LoadOptions {
                    synthetic,
                    bars_per_day,
                },
                by_product,
            };
            run_backtest_cmd(&config, &opts, json, &output_dir)
        }
        Commands::Inspect { config, synthetic } => run_inspect(&config, synthetic),
    }
}

fn run_backtest_cmd(
    config_path: &Path,
    opts: &RunOptions,
    json: bool,
    output_dir: &Path,
) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let outcome = run_from_config(&config, opts)?;
    let fitted = &outcome.fitted;

    if let Some(report) = &fitted.report {
        if json {
            println!("{}", export_scorecard_json(&report.scorecard)?);
        } else {
            println!();
            println!("=== Backtest Result ===");
            println!("Name:           {}", fitted.config.name);
            println!(
                "Period:         {} to {}",
                fitted.config.range.start, fitted.config.range.end
            );
            println!("Variant:        {}", fitted.config.variant);
            println!("Products:       {}", fitted.flagged_products().join(", "));
            println!("Run id:         {}", fitted.run_id);
            print_scorecard(&report.scorecard);
        }
        for missing in fitted.skipped.iter().chain(&report.skipped) {
            println!("WARNING: {missing}");
        }
    }
    if !json {
        for (product, report) in &fitted.product_reports {
            println!();
            println!("--- {product} ---");
            print_scorecard(&report.scorecard);
        }
    }
    if outcome.provenance.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }

    let run_dir = save_artifacts(fitted, &outcome.provenance, output_dir)?;
    info!(dir = %run_dir.display(), "artifacts saved");
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn fmt_opt(value: Option<f64>, scale: f64, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v * scale),
        None => "n/a".to_string(),
    }
}

fn print_scorecard(card: &Scorecard) {
    println!();
    println!("{:<16}{:>12}{:>12}{:>12}", "", "all", "long", "short");
    let tracks: [TrackMetrics; 3] = [card.all, card.long, card.short];
    let row = |label: &str, cell: &dyn Fn(&TrackMetrics) -> String| {
        let cells: Vec<String> = tracks.iter().map(|t| format!("{:>12}", cell(t))).collect();
        println!("{label:<16}{}", cells.concat());
    };
    row("Win Rate %", &|t| fmt_opt(t.win_rate, 100.0, 1));
    row("P/L Ratio", &|t| fmt_opt(t.profit_loss_ratio, 1.0, 2));
    row("Mean Return %", &|t| fmt_opt(t.mean_return, 100.0, 3));
    row("Trades", &|t| t.trade_count.to_string());
    row("Trades / Day", &|t| fmt_opt(t.trade_count_per_day, 1.0, 2));
    row("Total Profit %", &|t| fmt_opt(t.total_profit, 100.0, 2));
}

fn describe_panel(label: &str, panel: &Panel<f64>) {
    let span = match (panel.index().first(), panel.index().last()) {
        (Some(first), Some(last)) => format!("{first} .. {last}"),
        _ => "empty".to_string(),
    };
    println!(
        "{label:<12}{:>4} products {:>8} rows   {span}",
        panel.width(),
        panel.height()
    );
    for product in panel.products() {
        let cells = panel.cells(product).unwrap_or_default();
        let defined = cells.iter().filter(|v| !v.is_nan()).count();
        println!("    {product:<8}{defined:>8} defined");
    }
}

fn run_inspect(config_path: &Path, synthetic: bool) -> Result<()> {
    let config = BacktestConfig::from_file(config_path)?;
    let fit = config.to_fit_config()?;

    println!("=== Config ===");
    println!("Name:           {}", fit.name);
    println!("Period:         {} to {}", fit.range.start, fit.range.end);
    println!("Products:       {}", fit.products.join(", "));
    println!("Variant:        {}", fit.variant);
    println!("Flag source:    {:?}", fit.source);
    println!("Cost:           {}", fit.cost);
    println!("Fold:           {}", config.backtest.fold);
    println!(
        "Thresholds:     open {} x ratio {} / close {} / window {}",
        fit.params.open_coef, fit.params.ratio, fit.params.close_coef, fit.params.ma_window
    );
    println!("Run id:         {}", fit.run_id()?);

    let opts = LoadOptions {
        synthetic,
        ..LoadOptions::default()
    };
    let loaded = load_inputs(&config, &opts)?;
    println!();
    println!("=== Inputs ===");
    describe_panel("prices", &loaded.prices);
    if let Some(signals) = &loaded.signals {
        describe_panel("signals", signals);
    }
    if let Some(liquidity) = &loaded.liquidity {
        describe_panel("liquidity", liquidity);
    }
    if let Some(flags) = &loaded.flags {
        for product in flags.products() {
            let events = flags.column(product).map_or(0, |c| c.defined_count());
            println!("flags       {product:<8}{events:>8} events");
        }
    }
    for (product, frame) in &loaded.ohlcv {
        println!("ohlcv       {product:<8}{:>8} bars", frame.len());
    }
    for missing in &loaded.skipped {
        println!("WARNING: {missing}");
    }
    println!("Dataset hash:   {}", loaded.dataset_hash);
    Ok(())
}
