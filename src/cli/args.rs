//! CLI argument definitions using clap derive

use crate::inline::InlineFormat;
use crate::transport::Method;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// panelcache - fetch HTML fragments with every image inlined
///
/// Fetches a fragment, rewrites each <img> source into a data URL, and
/// serves repeat loads of the same key from an in-memory cache.
#[derive(Parser, Debug)]
#[command(name = "panelcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PANELCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a fragment into a display target
    Load(LoadArgs),

    /// Fetch and parse a fragment without inlining its images
    Inspect(InspectArgs),

    /// Print the data URL for a single image
    Inline(InlineArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the load command
#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Fragment locator (URL or file path)
    pub key: String,

    /// Write the resolved markup to this file instead of stdout
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Request method (GET or POST)
    #[arg(short, long)]
    pub method: Option<Method>,

    /// Number of times to load; loads after the first are served from cache
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Inline image encoding (png or jpeg)
    #[arg(short, long)]
    pub format: Option<InlineFormat>,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Fragment locator (URL or file path)
    pub key: String,

    /// Request method (GET or POST)
    #[arg(short, long)]
    pub method: Option<Method>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments for the inline command
#[derive(Parser, Debug)]
pub struct InlineArgs {
    /// Image locator (URL, file path or data URL)
    pub locator: String,

    /// Inline image encoding (png or jpeg)
    #[arg(short, long)]
    pub format: Option<InlineFormat>,
}

/// Output format for listings
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_load() {
        let cli = Cli::parse_from([
            "panelcache",
            "load",
            "panel.html",
            "--method",
            "post",
            "--repeat",
            "3",
            "--format",
            "jpeg",
        ]);
        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.key, "panel.html");
                assert_eq!(args.method, Some(Method::Post));
                assert_eq!(args.repeat, 3);
                assert_eq!(args.format, Some(InlineFormat::Jpeg));
                assert!(args.target.is_none());
            }
            _ => panic!("expected load command"),
        }
    }

    #[test]
    fn rejects_unknown_method() {
        assert!(Cli::try_parse_from(["panelcache", "load", "a.html", "--method", "PUT"]).is_err());
    }

    #[test]
    fn rejects_zero_repeat() {
        assert!(Cli::try_parse_from(["panelcache", "load", "a.html", "--repeat", "0"]).is_err());
    }

    #[test]
    fn parse_config_init_force() {
        let cli = Cli::parse_from(["panelcache", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigArgs {
                action: Some(ConfigAction::Init { force: true })
            })
        ));
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::parse_from(["panelcache", "-vv", "inspect", "panel.html"]);
        assert_eq!(cli.verbose, 2);
    }
}
