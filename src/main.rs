//! bufcache - module cache inspection tool
//!
//! CLI entry point that dispatches to subcommands.

use bufcache::cli::{Cli, Commands};
use bufcache::config::{ConfigManager, LogFormat};
use bufcache::error::CacheResult;
use clap::Parser;
use console::style;
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

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let mut config = config_manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("bufcache=warn"),
        1 => EnvFilter::new("bufcache=info"),
        _ => EnvFilter::new("bufcache=debug"),
    };

    match config.general.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    debug!("Loaded config from {}", config_manager.path().display());

    if let Some(dir) = cli.cache_dir {
        config.cache.dir = Some(dir);
    }

    // Dispatch to command
    match cli.command {
        Commands::Prefix(args) => bufcache::cli::commands::prefix(args, &config).await,
        Commands::List(args) => bufcache::cli::commands::list(args, &config).await,
        Commands::Show(args) => bufcache::cli::commands::show(args, &config).await,
        Commands::Verify(args) => bufcache::cli::commands::verify(args, &config).await,
        Commands::Config(args) => {
            bufcache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
