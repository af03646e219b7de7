//! Flight Logger CLI
//!
//! Pairs a drone, logs telemetry to CSV at a fixed rate, and stops on Ctrl+C.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use flight_domain::{DEFAULT_SAMPLE_RATE_HZ, SampleRate};
use flight_logger::{
    CsvRecorder, FlightProfile, LoggingSession, ShutdownSignal, SimulatedDrone, TelemetryDevice,
};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{Instrument, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "flight-logger")]
#[command(about = "Log drone telemetry to CSV during manual flight")]
struct Args {
    /// Output CSV file (created or truncated)
    #[arg(short, long, default_value = "drone_flight_log.csv")]
    output: PathBuf,

    /// Target sampling rate in Hz
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE_HZ)]
    rate_hz: f64,

    /// Seed for the simulated drone (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit diagnostics as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    let rate = SampleRate::new(args.rate_hz)?;

    // before pairing, so an early Ctrl+C still lands and saves
    let shutdown = ShutdownSignal::install().context("failed to install signal handlers")?;

    let mut drone = SimulatedDrone::new(FlightProfile::default(), args.seed);
    drone.pair().context("failed to pair with drone")?;
    info!(seed = ?args.seed, "Drone paired");

    let recorder = CsvRecorder::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let (stop_tx, stop_rx) = watch::channel(false);
    shutdown.forward(stop_tx);

    let span = tracing::info_span!(
        "session",
        id = %Uuid::new_v4(),
        started_at = %Utc::now().to_rfc3339()
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = LoggingSession::new(drone, recorder, rate)
        .run(&mut out, stop_rx)
        .instrument(span)
        .await?;

    info!(
        samples = summary.samples,
        flight_samples = summary.flight_samples,
        achieved_rate_hz = summary.achieved_rate_hz(),
        "Flight log complete"
    );
    Ok(())
}

/// Diagnostics go to stderr; stdout carries the live status lines.
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
