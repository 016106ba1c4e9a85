//! CLI command definitions and argument parsing.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// OcGis - Keep a feature layer of locate tickets in step with notices.
#[derive(Debug, Parser)]
#[command(name = "ocgis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "OCGIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one sync: read notices, reconcile, submit
    Run(RunArgs),

    /// Run syncs on a schedule until Ctrl+C
    Watch(WatchArgs),

    /// Extract notice files and print the records without touching the store
    Extract(ExtractArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Directory of notice files (overrides the configuration)
    #[arg(short, long)]
    pub notices: Option<PathBuf>,

    /// Reconcile and report, but submit nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Reconcile against an empty in-memory store instead of the feature layer
    #[arg(long)]
    pub memory: bool,
}

/// Arguments for the watch command.
#[derive(Debug, Parser)]
pub struct WatchArgs {
    /// Directory of notice files (overrides the configuration)
    #[arg(short, long)]
    pub notices: Option<PathBuf>,

    /// Minutes between runs (overrides the configuration)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Reconcile and report, but submit nothing
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Notice files to extract
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Include extraction diagnostics in the output
    #[arg(short, long)]
    pub diagnostics: bool,
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}
