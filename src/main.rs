//! Strategy composer - main entry point
//!
//! This binary provides three subcommands:
//! - presets: List the remote preset catalog
//! - indicator: Inspect an indicator's metadata descriptor
//! - submit: Compile a strategy file and submit it for backtesting

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "strategy-composer")]
#[command(about = "Compose trading strategies and submit them for backtesting", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to engine configuration file (defaults come from the
    /// environment when omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the preset catalog
    Presets,

    /// Inspect an indicator's metadata descriptor
    Indicator {
        /// Indicator display label, e.g. "EMA" or "Super Trend"
        name: String,
    },

    /// Compile a strategy file and submit it
    Submit {
        /// Path to the strategy JSON file
        #[arg(short, long)]
        strategy: String,

        /// Compile and print the payload without submitting
        #[arg(long)]
        dry_run: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Presets => "presets",
        Commands::Indicator { .. } => "indicator",
        Commands::Submit { .. } => "submit",
    };
    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Presets => commands::presets::run(cli.config).await,
        Commands::Indicator { name } => commands::indicator::run(cli.config, name).await,
        Commands::Submit { strategy, dry_run } => {
            commands::submit::run(cli.config, strategy, dry_run).await
        }
    }
}
