//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use ocgis_extractor::ExtractorConfig;
use ocgis_store::StoreConfig;
use ocgis_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Where notices are read from
    #[serde(default)]
    pub source: SourceConfig,

    /// Feature layer connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Notice extraction rules
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Run behaviour
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Directory notice source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory holding saved notice pages
    #[serde(default = "default_notice_dir")]
    pub dir: PathBuf,

    /// Text that starts each notice on a combined page; empty means one notice per file
    #[serde(default)]
    pub marker: String,

    /// File extensions to read (case-insensitive)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".ocgis").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::path()?, false),
        };

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else if explicit {
            Err(CliError::Config(format!(
                "Configuration file '{}' not found",
                path.display()
            )))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check the parts every command depends on.
    ///
    /// The store section is checked when a feature layer client is built.
    pub fn validate(&self) -> Result<()> {
        self.extractor
            .validate()
            .map_err(|e| CliError::Config(format!("extractor: {}", e)))?;
        self.sync
            .validate()
            .map_err(|e| CliError::Config(format!("sync: {}", e)))?;
        if self.source.extensions.is_empty() {
            return Err(CliError::Config(
                "source: extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: default_notice_dir(),
            marker: String::new(),
            extensions: default_extensions(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_notice_dir() -> PathBuf {
    PathBuf::from("notices")
}

fn default_extensions() -> Vec<String> {
    vec!["html".to_string(), "htm".to_string()]
}
