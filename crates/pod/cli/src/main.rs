//! podctl - replay pod operation scripts against an in-memory pod system
//!
//! Scripts are JSON documents of steps (deploy controllers, create pods,
//! mint, migrate, eject...). Each run starts from a fresh system built from
//! the loaded configuration and prints the step outcomes and the event
//! journal.

use anyhow::Context;
use clap::{Parser, Subcommand};
use pod_runtime::{PodSystem, PodSystemConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod output;
mod script;

use output::{OutputFormat, Report};
use script::{Runner, Script};

#[derive(Parser)]
#[command(name = "podctl")]
#[command(about = "Pod authority core - script runner", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "POD_CONFIG")]
    config: Option<String>,

    /// Log level (overrides config)
    #[arg(long, env = "POD_LOG_LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an operation script
    Run {
        /// Path to the script
        script: PathBuf,
    },

    /// Show effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = PodSystemConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs || config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Config => output::print_single(&config)?,
        Commands::Run { script } => {
            let raw = std::fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let parsed: Script = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", script.display()))?;
            info!(path = %script.display(), steps = parsed.steps.len(), "Running script");

            let mut runner = Runner::new(PodSystem::new(config));
            match runner.run(&parsed) {
                Ok(steps) => {
                    let report = Report {
                        steps: &steps,
                        events: runner.system().journal().events(),
                    };
                    output::print_report(&report, cli.output)?;
                }
                Err(e) => {
                    output::print_error(&e.to_string());
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
