mod commands;
mod cycle;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inkday_core::config::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inkday")]
#[command(about = "Keep an e-paper status display showing today's agenda and weather")]
struct Cli {
    /// Config file (default: ~/.config/inkday/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the display until interrupted
    Run,
    /// Run a single refresh and print when the next one would be
    Once,
    /// Print the agenda extracted for a day
    Agenda {
        /// Day to show (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let settings =
        Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(
        timezone = %settings.timezone,
        poll_minutes = settings.poll_interval.num_minutes(),
        off_hours = %settings.off_hours,
        "loaded configuration"
    );

    match cli.command {
        Commands::Run => commands::run::run(settings).await,
        Commands::Once => commands::once::run(settings).await,
        Commands::Agenda { date } => commands::agenda::run(settings, date.as_deref()).await,
    }
}
