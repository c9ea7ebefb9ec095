//! Command-line interface for testreport
//!
//! clap-derived argument parsing plus the command implementations. Every
//! command returns an [`ExitStatus`] so `main` can honor the exit-code contract.

use crate::pipeline::ExitStatus;
use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

pub use output::Output;

/// testreport - aggregate test results into JSON, Markdown and HTML reports
#[derive(Parser)]
#[command(name = "testreport", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (defaults to ./testreport.toml when present)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Aggregate results and write the configured reports
    Generate(GenerateArgs),
    /// Show the detected CI provider
    Detect {
        /// Print the CI identity as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments of `testreport generate`
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Suite results JSON written by the test runner
    #[arg(short, long, value_name = "FILE")]
    pub results: PathBuf,

    /// Istanbul-style coverage summary JSON
    #[arg(long, value_name = "FILE")]
    pub coverage: Option<PathBuf>,

    /// Directory the reports are written to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Comma-separated formats (json, markdown, html)
    #[arg(short, long, value_name = "LIST")]
    pub formats: Option<String>,

    /// Report title
    #[arg(long)]
    pub title: Option<String>,

    /// File name of the reports without extension
    #[arg(long, value_name = "NAME")]
    pub base_name: Option<String>,

    /// Generate one format at a time
    #[arg(long)]
    pub sequential: bool,

    /// Overall generation timeout in milliseconds, 0 disables it
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show {
        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<ExitStatus> {
        let output = Output::new(self.verbose > 0, self.quiet);
        let config_path = self.config.as_deref();

        match self.command {
            Some(Commands::Generate(args)) => commands::generate::execute(args, config_path, &output).await,
            Some(Commands::Detect { json }) => commands::detect::execute(json, &output),
            Some(Commands::Config(ConfigCommands::Show { json })) => {
                commands::config::show(config_path, json, &output)
            }
            None => {
                // Show help when no command is provided
                let mut cmd = Cli::command();
                cmd.print_help()?;
                Ok(ExitStatus::Success)
            }
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` takes precedence over flags.
pub fn setup_logging(verbose: u8, quiet: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            _ => "trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    });

    // A subscriber may already be installed when embedded in a larger program
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
