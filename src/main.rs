//! CLI Entry Point for spectrum-daq
//!
//! Provides command-line access to an HP 8562E behind a Prologix GPIB-USB
//! bridge:
//! - `acquire`: take one sweep and print the calibrated trace (CSV or JSON)
//! - `params`: print the current trace parameters
//! - `sweep`: set start/stop frequency and resolution bandwidth
//! - `config`: print the effective configuration
//!
//! Every command opens a session, runs, and closes it again, so the analyzer
//! is back in continuous sweep when the process exits.
//!
//! # Usage
//!
//! ```bash
//! spectrum-daq --port /dev/ttyUSB0 acquire --format csv > trace.csv
//! spectrum-daq --mock params --format json
//! spectrum-daq sweep --start 1000000 --stop 3000000000 --rbw 1000000
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daq_driver_hp8562e::{Hp8562eSession, SweepRequest};
use spectrum_daq::config::AppConfig;
use spectrum_daq::output::{self, OutputFormat};
use spectrum_daq::{logging, DaqError};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spectrum-daq", version)]
#[command(about = "HP 8562E spectrum analyzer acquisition over Prologix GPIB-USB", long_about = None)]
struct Cli {
    /// Configuration file (default: config/spectrum_daq.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial port of the Prologix bridge (overrides config)
    #[arg(long, global = true)]
    port: Option<String>,

    /// Use the simulated analyzer instead of hardware
    #[arg(long, global = true)]
    mock: bool,

    /// Log level: trace, debug, info, warn, error (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take one sweep and print the calibrated trace
    Acquire {
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },

    /// Print the analyzer's current trace parameters
    Params {
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Set span and resolution bandwidth (all values in Hz)
    Sweep {
        #[arg(long)]
        start: u64,

        #[arg(long)]
        stop: u64,

        #[arg(long)]
        rbw: u64,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    apply_overrides(&mut config, &cli);

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    config.validate()?;
    logging::init_from_config(&config)?;
    tracing::info!(app = %config.application.name, mock = config.analyzer.mock, "Starting");

    // Reject a bad sweep before touching the instrument.
    let sweep = match &cli.command {
        Commands::Sweep { start, stop, rbw } => Some(
            SweepRequest::new(*start, *stop, *rbw)
                .map_err(DaqError::from)
                .context("Invalid sweep")?,
        ),
        _ => None,
    };

    let session = Hp8562eSession::connect(&config.analyzer)
        .await
        .map_err(DaqError::from)
        .context("Failed to open analyzer session")?;

    let result = run(&session, &cli.command, sweep).await;
    session.close().await;
    result
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(port) = &cli.port {
        config.analyzer.port = port.clone();
    }
    if cli.mock {
        config.analyzer.mock = true;
    }
    if let Some(level) = &cli.log_level {
        config.application.log_level = level.clone();
    }
}

async fn run(
    session: &Hp8562eSession,
    command: &Commands,
    sweep: Option<SweepRequest>,
) -> Result<()> {
    match command {
        Commands::Acquire { format } => {
            let trace = session.acquire().await.map_err(DaqError::from)?;
            tracing::info!("Acquired {} points", trace.len());
            output::write_trace(std::io::stdout().lock(), &trace, *format)?;
        }
        Commands::Params { format } => {
            let parameters = session.trace_parameters().await.map_err(DaqError::from)?;
            output::write_parameters(std::io::stdout().lock(), &parameters, *format)?;
        }
        Commands::Sweep { .. } => {
            if let Some(request) = sweep {
                session
                    .configure_sweep(&request)
                    .await
                    .map_err(DaqError::from)?;
                let parameters = session.trace_parameters().await.map_err(DaqError::from)?;
                tracing::info!(
                    "Sweep set: {} to {} Hz, RBW {} Hz",
                    parameters.start_frequency,
                    parameters.stop_frequency,
                    parameters.resolution_bandwidth
                );
            }
        }
        Commands::Config => {}
    }
    Ok(())
}
