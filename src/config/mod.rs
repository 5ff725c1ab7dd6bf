//! Configuration management for fhirflat.
//!
//! This module provides TOML-based loading, parsing, and validation of the
//! application configuration (`fhirflat.toml`).
//!
//! # Overview
//!
//! fhirflat uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Default values for every setting
//! - `FHIRFLAT_<SECTION>_<KEY>` environment overrides
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use fhirflat::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("fhirflat.toml")?;
//!
//! println!("Schemas: {}", config.batch.config_dir.display());
//! println!("Output: {}", config.batch.output_dir.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`BatchSettings`] - Schema, output and work directories, parallelism
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [batch]
//! config_dir = "schemas"
//! output_dir = "${FHIRFLAT_OUTPUT_ROOT}/tables"
//! work_dir = "/tmp/fhirflat"
//! missing_path = "missing_paths.csv"
//! parallel_inputs = 4
//! input_format = "ndjson"
//!
//! [logging]
//! local_enabled = true
//! local_path = "./logs"
//! local_rotation = "daily"
//! ```
//!
//! Extraction schemas (one per resource table) are a separate format; see
//! [`crate::core::schema`].

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::{load_config, load_config_or_default, substitute_env_vars};
pub use schema::{ApplicationConfig, BatchSettings, FlatConfig, LoggingConfig};
