//! SignalForge CLI — analyze price history files and print signal reports.
//!
//! Commands:
//! - `analyze` — one CSV file, one JSON report on stdout
//! - `batch` — many CSV files analyzed in parallel, one JSON line each
//! - `config` — print the default configuration as TOML

mod loader;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde_json::json;
use signalforge_core::forecast::InMemoryModelCache;
use signalforge_core::{AnalysisConfig, Analyzer};
use tracing::{error, info};

use crate::loader::{load_series, symbol_from_path};
use crate::logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(
    name = "signalforge",
    version,
    about = "SignalForge CLI — indicators, forecast ensemble and DCA plans from price history"
)]
struct Cli {
    /// Log output format. Level is taken from RUST_LOG.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one CSV price history and print the report as JSON.
    Analyze {
        /// CSV file with timestamp,open,high,low,close,volume columns.
        #[arg(long, short)]
        input: PathBuf,

        /// Symbol for logging and cache keys. Defaults to the file stem.
        #[arg(long)]
        symbol: Option<String>,

        /// TOML analysis configuration. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON report.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Analyze several CSV files in parallel, one JSON line per file.
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// TOML analysis configuration. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Commands::Analyze {
            input,
            symbol,
            config,
            pretty,
        } => run_analyze(&input, symbol, config.as_deref(), pretty),
        Commands::Batch { inputs, config } => run_batch(&inputs, config.as_deref()),
        Commands::Config => {
            print!("{}", AnalysisConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

fn run_analyze(
    input: &Path,
    symbol: Option<String>,
    config: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let analyzer = Analyzer::new(load_config(config)?)?;
    let series = load_series(input)?;
    let symbol = symbol.unwrap_or_else(|| symbol_from_path(input));

    let report = analyzer
        .analyze(&symbol, &series)
        .with_context(|| format!("analysis failed for {symbol}"))?;

    let out = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    Ok(())
}

fn run_batch(inputs: &[PathBuf], config: Option<&Path>) -> Result<()> {
    let analyzer = Analyzer::new(load_config(config)?)?
        .with_cache(Arc::new(InMemoryModelCache::new()));

    let lines: Vec<(bool, String)> = inputs
        .par_iter()
        .map(|path| {
            let symbol = symbol_from_path(path);
            let outcome = load_series(path).and_then(|series| {
                analyzer
                    .analyze(&symbol, &series)
                    .with_context(|| format!("analysis failed for {symbol}"))
            });
            match outcome {
                Ok(report) => serde_json::to_string(&report)
                    .map(|line| (true, line))
                    .unwrap_or_else(|e| (false, error_line(path, &e.into()))),
                Err(e) => {
                    error!(file = %path.display(), error = %format!("{e:#}"), "batch item failed");
                    (false, error_line(path, &e))
                }
            }
        })
        .collect();

    let failures = lines.iter().filter(|(ok, _)| !ok).count();
    for (_, line) in &lines {
        println!("{line}");
    }
    info!(files = inputs.len(), failures, "batch complete");

    if failures > 0 {
        anyhow::bail!("{failures} of {} files failed", inputs.len());
    }
    Ok(())
}

fn error_line(path: &Path, err: &anyhow::Error) -> String {
    json!({
        "file": path.display().to_string(),
        "error": format!("{err:#}"),
    })
    .to_string()
}
