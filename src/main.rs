//! Plugup - editor plugin set updater
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use plugup::cli::{Cli, Commands, CommonArgs, LogFormat};
use plugup::config::{Config, ConfigManager};
use plugup::error::PlugupResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PlugupResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.common.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    init_logging(&cli.common, &config);
    debug!("Using configuration {}", config_manager.path().display());

    // Dispatch to command
    match cli.command {
        Some(Commands::Add(args)) => plugup::cli::commands::add(args, &cli.common, &config).await,
        Some(Commands::Update(args)) => {
            plugup::cli::commands::update(args, &cli.common, &config).await
        }
        None => plugup::cli::commands::update(Default::default(), &cli.common, &config).await,
    }
}

/// Initialize logging: 0 = warn, 1 = info, 2+ = debug
fn init_logging(common: &CommonArgs, config: &Config) {
    let level = common.log_level();
    let filter = EnvFilter::new(format!("plugup={}", level.as_str()));

    let json = match common.log_format {
        Some(format) => format == LogFormat::Json,
        None => config.general.log_format.eq_ignore_ascii_case("json"),
    };

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .without_time()
            .init();
    }
}
