//! banned-api CLI tool.
//!
//! Usage:
//! ```bash
//! banned-api check [OPTIONS] [PATH]
//! banned-api resolve [PATH] <DECLARATION_ID>...
//! banned-api init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

/// Reports uses of banned APIs in Rust projects
#[derive(Parser)]
#[command(name = "banned-api")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file used instead of the project's banned-api.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a project against its banned symbol list
    Check {
        /// Path to analyze (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Policy files, relative to PATH (can be specified multiple times)
        #[arg(short, long)]
        policy: Vec<PathBuf>,

        /// Exclude patterns (can be specified multiple times)
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Show what declaration ids resolve to
    Resolve {
        /// Path to analyze (default: current directory)
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Declaration ids, e.g. `T:crate::legacy::Client`
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Initialize configuration and an empty banned symbol list
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output with source excerpts.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-diagnostic compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            policy,
            exclude,
        } => {
            let config = settings::load(&path, cli.config.as_deref())?;
            commands::check::run(&path, format, policy, exclude, config)
        }
        Commands::Resolve { path, ids } => {
            let config = settings::load(&path, cli.config.as_deref())?;
            commands::resolve::run(&path, &ids, config)
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
