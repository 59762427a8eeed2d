//! crawlprobe CLI - Main Entry Point
//!
//! Locates the seofrog crawler, runs it against a fixed target and judges the
//! workbook it exports.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use crawlprobe_common::{HarnessConfig, DEFAULT_CONFIG_FILE};

mod commands;
mod open;
mod output;

use commands::{init_config, inspect, locate, run};

/// Exit code for failures of the environment rather than of the crawl
const ENVIRONMENT_FAILURE_EXIT_CODE: i32 = 4;

/// crawlprobe - verification harness for the seofrog crawler
#[derive(Parser)]
#[command(name = "crawlprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to ./crawlprobe.toml when present)
    #[arg(long, env = "CRAWLPROBE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate, run and verify the crawler
    Run(run::RunArgs),

    /// Validate an existing workbook without running anything
    Inspect(inspect::InspectArgs),

    /// Show which entry point would be used
    Locate(locate::LocateArgs),

    /// Write the default configuration to a file
    InitConfig(init_config::InitConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; stderr keeps JSON output on stdout clean
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ENVIRONMENT_FAILURE_EXIT_CODE
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Run(args) => run::execute(args, load_config(cli.config.as_deref())?, cli.format).await,
        Commands::Inspect(args) => inspect::execute(args, load_config(cli.config.as_deref())?, cli.format),
        Commands::Locate(args) => locate::execute(args, load_config(cli.config.as_deref())?, cli.format),
        Commands::InitConfig(args) => init_config::execute(args),
    }
}

/// Resolve the configuration: an explicit file must exist, the default file is optional
fn load_config(explicit: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    let path = match explicit {
        Some(path) => {
            anyhow::ensure!(path.is_file(), "config file not found: {}", path.display());
            path
        }
        None => Path::new(DEFAULT_CONFIG_FILE),
    };

    let config = HarnessConfig::load(path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    tracing::debug!("Configuration resolved from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "crawlprobe",
            "--format",
            "json",
            "run",
            "--host",
            "example.org",
            "--max-urls",
            "3",
            "--timeout",
            "60",
            "--open",
            "--yes",
        ])
        .unwrap();

        assert!(matches!(cli.format, output::OutputFormat::Json));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.host.as_deref(), Some("example.org"));
                assert_eq!(args.max_urls, Some(3));
                assert_eq!(args.timeout, Some(60));
                assert!(args.open && args.yes);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.toml");
        std::fs::write(&path, "timeout_secs = 42\n[target]\nhost = \"example.net\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.timeout_secs, 42);
        assert_eq!(config.target.host, "example.net");
        assert_eq!(config.target.max_urls, 5);
    }
}
