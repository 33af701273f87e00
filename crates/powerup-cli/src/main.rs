//! Powerup CLI
//!
//! Command-line interface for replaying reward scenarios and inspecting the
//! power-up curve.

mod scenario;
mod settings;

use clap::{Parser, Subcommand};
use powerup_core::Fixed;
use powerup_economics::{LogCurve, PowerUpCurve};
use scenario::Scenario;
use settings::{EngineConfig, LoggingConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "powerup")]
#[command(version)]
#[command(about = "Governance-weighted reward accrual engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "powerup.toml", env = "POWERUP_CONFIG")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario script and print a JSON report
    Simulate {
        /// Scenario script (TOML)
        #[arg(short, long)]
        script: PathBuf,

        /// Write the final records as a snapshot file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Evaluate the power-up curve
    Curve {
        /// Delegated governance tokens
        #[arg(short, long)]
        delegated: Fixed,

        /// Staked LP tokens
        #[arg(short, long)]
        lp: Fixed,
    },

    /// Print the effective configuration
    Config,
}

fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let default_level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = logging.format == "json";

    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::registry()
        .with(env_filter)
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
        }))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(&cli.config)?;
    init_logging(cli.verbose, &config.logging);

    match cli.command {
        Commands::Simulate { script, snapshot } => {
            let scenario = Scenario::from_file(&script)?;
            let (report, store) = scenario::run(&config, &scenario)?;
            if let Some(path) = snapshot {
                store.save_to(&path)?;
                tracing::info!("Snapshot written to {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Curve { delegated, lp } => {
            let curve = LogCurve::new(config.economics.curve)?;
            println!("{}", curve.power_up(delegated, lp));
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
