//! panelcache - CLI entry point that dispatches to subcommands

use clap::Parser;
use console::style;
use panelcache::cli::{Cli, Commands};
use panelcache::config::ConfigManager;
use panelcache::error::PanelResult;
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
            if e.is_retryable() {
                eprintln!(
                    "{} nothing was cached; running the command again retries the fetch",
                    style("Note:").dim()
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PanelResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG overrides
    let default_filter = match cli.verbose {
        0 => "panelcache=warn",
        1 => "panelcache=info",
        _ => "panelcache=debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    debug!("Using config at {}", config_manager.path().display());

    match cli.command {
        Commands::Load(args) => panelcache::cli::commands::load(args, &config).await,
        Commands::Inspect(args) => panelcache::cli::commands::inspect(args, &config).await,
        Commands::Inline(args) => panelcache::cli::commands::inline(args, &config).await,
        Commands::Config(args) => {
            panelcache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
