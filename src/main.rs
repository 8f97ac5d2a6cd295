use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bkpost::core::{JobContext, Orchestrator, UnmountOutcome};
use bkpost::{config, context, logging};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "bkpost")]
#[command(about = "Post-backup storage checks, unmount and notifications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to /etc/bkpost/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Flags layered over the config file.
#[derive(clap::Args, Serialize)]
struct Overrides {
    /// Use in-memory adapters instead of the host runtime
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    simulation: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    json_logs: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full job: storage check, transfer, unmount, notification
    Run,
    /// Evaluate free disk space on the backup host
    Check,
    /// Release the network share
    Unmount,
    /// Send a message through the configured notification channel
    Notify { message: String },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::AppConfig::new(cli.config.as_deref(), Some(&cli.overrides))?;

    logging::init(logging::LogConfig {
        json: config.json_logs,
        verbose: config.verbose,
    });

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let orchestrator = Orchestrator::new(context::AppContext::new(config));

    match cli.command {
        Commands::Run => run_job(&orchestrator).await,
        Commands::Check => run_check(&orchestrator).await,
        Commands::Unmount => run_unmount(&orchestrator).await,
        Commands::Notify { message } => {
            orchestrator.notify(&message).await;
            Ok(())
        }
        Commands::Config => Ok(()),
    }
}

async fn run_job(orchestrator: &Orchestrator) -> Result<()> {
    let report = orchestrator.run_job().await;
    print_json(&report)?;

    if !report.success {
        bail!("Backup job failed");
    }
    Ok(())
}

async fn run_check(orchestrator: &Orchestrator) -> Result<()> {
    let report = orchestrator.check_storage().await;
    print_json(&report)?;

    match report {
        Some(report) if !report.ready => bail!("Not enough free space for a local backup"),
        _ => Ok(()),
    }
}

async fn run_unmount(orchestrator: &Orchestrator) -> Result<()> {
    let mut job = JobContext::new("unmount");
    match orchestrator.unmount(&mut job).await.context("Unmount failed")? {
        UnmountOutcome::NotNetworkMount => println!("Backup target is not a network mount"),
        UnmountOutcome::Unmounted { stdout } => print!("{}", stdout),
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
