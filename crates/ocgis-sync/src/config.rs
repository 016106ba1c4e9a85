//! Configuration for sync runs
//!
//! Defines parallelism, the run timeout, the stale-ticket rule and the
//! schedule for background runs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with store tickets that are OPEN but absent from a new batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaleTicketPolicy {
    /// Leave them untouched; `deletes` stays empty
    #[default]
    Ignore,
    /// Delete them from the store
    Delete,
}

/// Configuration for the sync pipeline
///
/// # Examples
///
/// ```
/// use ocgis_sync::{StaleTicketPolicy, SyncConfig};
///
/// // Default configuration (balanced)
/// let config = SyncConfig::default();
/// assert_eq!(config.workers, 4);
/// assert_eq!(config.stale_ticket_policy, StaleTicketPolicy::Ignore);
///
/// // Aggressive: more parallelism, frequent runs
/// let config = SyncConfig::aggressive();
/// assert_eq!(config.workers, 8);
///
/// // Lenient: gentle on the notice site and the feature service
/// let config = SyncConfig::lenient();
/// assert_eq!(config.workers, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Parallel document extractions
    /// Default: 4
    pub workers: usize,

    /// Parallel single-ticket lookups when the store has no bulk query
    /// Default: 4
    pub lookup_concurrency: usize,

    /// Tickets per bulk lookup request
    /// Default: 200
    pub bulk_lookup_chunk: usize,

    /// Whole-run timeout in seconds; unscheduled work is abandoned
    /// Default: 300
    pub run_timeout_secs: u64,

    /// Rule for OPEN store tickets missing from the batch
    /// Default: ignore
    #[serde(default)]
    pub stale_ticket_policy: StaleTicketPolicy,

    /// Query the store for tickets still OPEN after submitting
    /// Default: true
    #[serde(default = "default_requery_open")]
    pub requery_open: bool,

    /// Dry-run mode: reconcile and log, but submit nothing
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// How often the background worker runs (in minutes)
    /// Default: 60
    pub interval_minutes: u64,
}

fn default_requery_open() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            lookup_concurrency: 4,
            bulk_lookup_chunk: 200,
            run_timeout_secs: 300,
            stale_ticket_policy: StaleTicketPolicy::Ignore,
            requery_open: true,
            dry_run: false,
            interval_minutes: 60,
        }
    }
}

impl SyncConfig {
    /// Aggressive configuration (more parallelism, runs every 15 minutes)
    ///
    /// Suitable when the feature service is dedicated and notices arrive often.
    pub fn aggressive() -> Self {
        Self {
            workers: 8,
            lookup_concurrency: 8,
            bulk_lookup_chunk: 500,
            run_timeout_secs: 600,
            interval_minutes: 15,
            ..Self::default()
        }
    }

    /// Lenient configuration (serial work, runs every 4 hours)
    ///
    /// Suitable for shared services with strict rate limits.
    pub fn lenient() -> Self {
        Self {
            workers: 1,
            lookup_concurrency: 1,
            bulk_lookup_chunk: 50,
            run_timeout_secs: 900,
            interval_minutes: 240,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be at least 1".to_string());
        }
        if self.lookup_concurrency == 0 {
            return Err("lookup_concurrency must be at least 1".to_string());
        }
        if self.bulk_lookup_chunk == 0 {
            return Err("bulk_lookup_chunk must be at least 1".to_string());
        }
        if self.run_timeout_secs == 0 {
            return Err("run_timeout_secs must be greater than 0".to_string());
        }
        if self.interval_minutes == 0 {
            return Err("interval_minutes must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Get run interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    /// Get run timeout as Duration
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
