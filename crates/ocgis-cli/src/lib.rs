//! OcGis CLI library.
//!
//! Configuration loading, the directory notice source, command execution
//! and output formatting for the `ocgis` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod source;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
pub use source::DirectoryNoticeSource;
