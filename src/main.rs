use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use basketwatch::app::{App, Config, RunExit};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

/// Watch prediction-market baskets for guaranteed-payout arbitrage.
#[derive(Debug, Parser)]
#[command(name = "basketwatch", version, about)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable execution (overrides `execution.enabled`).
    #[arg(long)]
    execute: bool,

    /// Stop after this many seconds (overrides `run.max_runtime_secs`).
    #[arg(long)]
    max_runtime_secs: Option<u64>,

    /// Universe file (overrides `universe.path`).
    #[arg(long)]
    universe: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if cli.execute {
        config.execution.enabled = true;
    }
    if let Some(secs) = cli.max_runtime_secs {
        config.run.max_runtime_secs = secs;
    }
    if let Some(path) = &cli.universe {
        config.universe.path = path.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Both reqwest and tungstenite pull in rustls; pick the provider once.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    config.init_logging();
    info!(
        execute = config.execution.enabled,
        universe = %config.universe.path.display(),
        "basketwatch starting"
    );

    let code = tokio::select! {
        result = App::run(config) => match result {
            Ok(exit) => {
                match exit {
                    RunExit::Deadline => info!("Run deadline reached"),
                    RunExit::Halted => info!("Stopped by daily loss guard"),
                    RunExit::FeedClosed => info!("Market feed closed"),
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Fatal error");
                ExitCode::FAILURE
            }
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            ExitCode::SUCCESS
        }
    };

    info!("basketwatch stopped");
    code
}
