//! Configuration schema types
//!
//! This module defines the application configuration (`fhirflat.toml`).
//! Per-resource extraction schemas live in `core::schema`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::schema::InputFormat;

/// Main fhirflat configuration
///
/// This is the root configuration structure that maps to the TOML file.
/// Every section is optional; a missing file yields [`FlatConfig::default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlatConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Batch driver settings
    #[serde(default)]
    pub batch: BatchSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FlatConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.batch.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Batch driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Directory holding `*.toml` extraction schemas
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Root directory for produced table files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory for per-resource-type intermediate files
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Missing-path report shared by every schema of a batch
    #[serde(default)]
    pub missing_path: Option<PathBuf>,

    /// Number of input files processed concurrently
    #[serde(default = "default_parallel_inputs")]
    pub parallel_inputs: usize,

    /// Framing of batch input files
    #[serde(default = "default_batch_input_format")]
    pub input_format: InputFormat,
}

impl BatchSettings {
    fn validate(&self) -> Result<(), String> {
        if self.parallel_inputs == 0 || self.parallel_inputs > 64 {
            return Err(format!(
                "batch.parallel_inputs must be between 1 and 64, got {}",
                self.parallel_inputs
            ));
        }
        if self.config_dir.as_os_str().is_empty() {
            return Err("batch.config_dir cannot be empty".to_string());
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err("batch.output_dir cannot be empty".to_string());
        }
        if self.work_dir.as_os_str().is_empty() {
            return Err("batch.work_dir cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            output_dir: default_output_dir(),
            work_dir: default_work_dir(),
            missing_path: None,
            parallel_inputs: default_parallel_inputs(),
            input_format: default_batch_input_format(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("fhirflat")
}

fn default_parallel_inputs() -> usize {
    4
}

fn default_batch_input_format() -> InputFormat {
    InputFormat::Ndjson
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
