//! Domain error types
//!
//! This module defines the error hierarchy for fhirflat. Field- and record-level
//! problems are recovered locally by the runner; the variants here are what
//! surfaces to callers when recovery is not possible.

use thiserror::Error;

/// Main fhirflat error type
///
/// This is the primary error type used throughout the library.
#[derive(Debug, Error)]
pub enum FlatError {
    /// Schema or application configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// One input line is not valid JSON
    #[error("Record parse error: {0}")]
    RecordParse(String),

    /// A record could not be evaluated against a schema
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// I/O errors (cannot open input, output, or intermediate files)
    #[error("I/O error: {0}")]
    Io(String),

    /// Encoder failures in an output sink
    #[error("Output error: {0}")]
    Output(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Configuration-specific errors
///
/// Raised while loading a schema definition or the application config.
/// A `ConfigError` is fatal for the schema it concerns.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File does not exist
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// File could not be read or parsed as TOML
    #[error("Failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },

    /// A required section is absent
    #[error("Missing [{section}] section in {origin}")]
    MissingSection { origin: String, section: String },

    /// A setting carries a value outside its allowed set
    #[error("Invalid value '{value}' for '{key}'. Expected one of: {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },

    /// A path expression could not be parsed
    #[error("Malformed expression for column '{column}': {reason}")]
    MalformedExpression { column: String, reason: String },

    /// The input/output format pair cannot be streamed
    #[error("Input format '{input}' is only supported with 'csv' output format, got '{output}'")]
    UnsupportedFormatCombination { input: String, output: String },

    /// Referenced environment variables are not set
    #[error("Missing required environment variables: {0}")]
    MissingEnvVars(String),

    /// Validation of a loaded configuration failed
    #[error("Configuration validation failed: {0}")]
    Invalid(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for FlatError {
    fn from(err: std::io::Error) -> Self {
        FlatError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for FlatError {
    fn from(err: serde_json::Error) -> Self {
        FlatError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for FlatError {
    fn from(err: toml::de::Error) -> Self {
        FlatError::Config(ConfigError::Parse {
            origin: "TOML document".to_string(),
            message: err.to_string(),
        })
    }
}

impl From<csv::Error> for FlatError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            FlatError::Io(err.to_string())
        } else {
            FlatError::Output(format!("CSV: {err}"))
        }
    }
}

impl From<arrow::error::ArrowError> for FlatError {
    fn from(err: arrow::error::ArrowError) -> Self {
        FlatError::Output(format!("Arrow: {err}"))
    }
}

impl From<parquet::errors::ParquetError> for FlatError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        FlatError::Output(format!("Parquet: {err}"))
    }
}

impl FlatError {
    /// Whether the error should abort the current schema run rather than
    /// skipping a single record
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FlatError::RecordParse(_) | FlatError::Extraction(_))
    }
}
