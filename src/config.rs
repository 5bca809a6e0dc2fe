//! Configuration management for Vigil
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

mod defaults;

use crate::error::{Result, VigilError};
use crate::intervals::{IntervalTable, parse_overrides};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV: &str = "VIGIL_CONFIG";

/// Environment variable carrying `key=seconds` interval overrides
pub const INTERVALS_ENV: &str = "VIGIL_INTERVALS";

/// Largest backoff base; the deepest backoff level sleeps a thousand times this
pub const MAX_BACKOFF_BASE_SECS: u64 = 3600;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Vehicle API access
    pub api: ApiConfig,

    /// External command channel
    pub command: CommandConfig,

    /// Per-poll record stream
    pub records: RecordsConfig,

    /// Interval overrides in seconds, keyed by state name or poll key
    pub intervals: BTreeMap<String, u64>,

    /// Base of the failure backoff: a failed cycle sleeps `base * 10^level`
    pub backoff_base_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console level override
    pub console_level: Option<String>,

    /// Optional file level override
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the daily rolled files)
    pub file: String,

    /// Number of rolled files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Vehicle API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the owner API
    pub base_url: String,

    /// Bearer access token
    pub access_token: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,

    /// Attempts for transient transport failures
    pub max_retries: u32,

    /// Delay between attempts
    pub retry_delay_secs: u64,

    /// How long `wake` waits for the vehicle to come online
    pub wake_timeout_secs: u64,
}

/// Command listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Datagram socket address the listener binds to
    pub bind: String,

    /// Capacity of each per-vehicle queue
    pub queue_capacity: usize,

    /// Upper bound for handing a request to a vehicle queue
    pub send_timeout_ms: u64,
}

/// Record stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Directory receiving the hourly record files
    pub directory: String,

    /// File name prefix
    pub prefix: String,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from `$VIGIL_CONFIG` or the default locations,
    /// then apply `$VIGIL_INTERVALS`
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::load_default_locations()?,
        };
        if let Ok(raw) = std::env::var(INTERVALS_ENV) {
            config.merge_interval_overrides(&raw)?;
        }
        Ok(config)
    }

    fn load_default_locations() -> Result<Self> {
        let default_paths = ["vigil.yaml", "/data/vigil.yaml", "/etc/vigil/config.yaml"];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Self::default())
    }

    /// Merge comma-separated `key=seconds` pairs over the file's overrides
    pub fn merge_interval_overrides(&mut self, raw: &str) -> Result<()> {
        for (key, secs) in parse_overrides(raw)? {
            self.intervals.insert(key, secs);
        }
        Ok(())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Interval table with this configuration's overrides applied
    pub fn interval_table(&self) -> Result<IntervalTable> {
        let mut table = IntervalTable::default();
        table.apply_overrides(&self.intervals)?;
        Ok(table)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(VigilError::validation(
                "api.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(VigilError::validation(
                "api.request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        if self.command.bind.trim().is_empty() {
            return Err(VigilError::validation(
                "command.bind",
                "Bind address cannot be empty",
            ));
        }

        if self.command.queue_capacity == 0 {
            return Err(VigilError::validation(
                "command.queue_capacity",
                "Must be greater than 0",
            ));
        }

        if self.command.send_timeout_ms == 0 {
            return Err(VigilError::validation(
                "command.send_timeout_ms",
                "Must be greater than 0",
            ));
        }

        if self.backoff_base_secs == 0 {
            return Err(VigilError::validation(
                "backoff_base_secs",
                "Must be greater than 0",
            ));
        }

        if self.backoff_base_secs > MAX_BACKOFF_BASE_SECS {
            return Err(VigilError::validation(
                "backoff_base_secs".to_string(),
                format!("Must be at most {MAX_BACKOFF_BASE_SECS}"),
            ));
        }

        self.interval_table()?;
        Ok(())
    }
}
