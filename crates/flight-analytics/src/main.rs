//! Flight Analyzer CLI
//!
//! Loads one telemetry CSV and prints the flight report.

use anyhow::{Context, Result};
use clap::Parser;
use flight_analytics::{AnalyticsEngine, AnalyzerConfig, DataSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flight-analyzer")]
#[command(about = "Compute flight statistics from a telemetry CSV log")]
struct Args {
    /// Local path or s3:// / s3a:// URI of the telemetry CSV
    #[arg(env = "FLIGHT_DATASET")]
    source: String,

    /// DuckDB worker threads (overrides FLIGHT_ENGINE_THREADS)
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AnalyzerConfig::from_env().context("invalid analyzer configuration")?;
    if let Some(threads) = args.threads {
        anyhow::ensure!(threads > 0, "--threads must be at least 1");
        config.threads = Some(threads);
    }
    init_tracing(&config.log_level, config.log_json);

    let source: DataSource = args.source.parse()?;
    info!(source = %source, remote = source.is_remote(), "Analyzing flight log");

    let report = AnalyticsEngine::scoped(&config, |engine| {
        let records = engine.load(&source)?;
        info!(records, "Telemetry loaded");
        engine.analyze()
    })?;

    print!("{}", report.render());
    report.ensure_complete()?;

    info!(
        valid = report.quality.valid_records,
        duration_s = report.duration_s.unwrap_or(0.0),
        "Analysis complete"
    );
    Ok(())
}

/// Diagnostics go to stderr; stdout carries the report.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
