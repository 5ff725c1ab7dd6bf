//! Schema model
//!
//! A schema describes how one kind of FHIR resource is flattened into one
//! table: the ordered output columns and their path expressions, an optional
//! anchor for one-to-many fan-out, I/O settings, and the declared paths the
//! drift auditor compares records against.

pub mod loader;

pub use loader::{load_schema, load_schema_str};

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::path::PathExpression;
use crate::domain::ConfigError;

/// Prefix marking a column (or declared audit path) as anchor-scoped
pub const ANCHOR_PREFIX: &str = "Anchor:";

/// A loaded, validated schema
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Schema name (the file stem, e.g. `Patient_address`)
    pub name: String,

    /// Output columns in declaration order
    pub columns: Vec<ColumnDef>,

    /// Fan-out anchor
    pub anchor: Option<PathExpression>,

    pub input_format: InputFormat,
    pub output_format: OutputFormat,
    pub write_mode: WriteMode,

    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,

    /// Missing-path report file; auditing is off when unset
    pub missing_path: Option<PathBuf>,

    pub audit: AuditSpec,
}

impl Schema {
    /// Column names in declaration order
    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Whether rows fan out over an anchor
    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Anchor expression text, used as context in missing-path reports
    pub fn anchor_source(&self) -> Option<&str> {
        self.anchor.as_ref().map(PathExpression::source)
    }

    /// NDJSON input streams rows and is only paired with CSV output
    pub fn check_formats(&self) -> Result<(), ConfigError> {
        if self.input_format == InputFormat::Ndjson && self.output_format != OutputFormat::Csv {
            return Err(ConfigError::UnsupportedFormatCombination {
                input: self.input_format.to_string(),
                output: self.output_format.to_string(),
            });
        }
        Ok(())
    }
}

/// One output column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub expression: PathExpression,
    pub scope: ColumnScope,
}

/// What a column's expression is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnScope {
    /// The whole record
    Record,
    /// The current anchor element
    Anchor,
}

/// Declared paths for drift auditing
///
/// Anchor paths are stored without the `Anchor:` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSpec {
    pub root_paths: BTreeSet<String>,
    pub anchor_paths: BTreeSet<String>,
    pub ignore_paths: BTreeSet<String>,
}

/// How input records are framed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// The whole input is one record
    #[default]
    Json,
    /// One record per line
    Ndjson,
}

impl FromStr for InputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(InputFormat::Json),
            "ndjson" => Ok(InputFormat::Ndjson),
            _ => Err(ConfigError::InvalidValue {
                key: "input_format".to_string(),
                value: s.to_string(),
                expected: "json, ndjson".to_string(),
            }),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Json => write!(f, "json"),
            InputFormat::Ndjson => write!(f, "ndjson"),
        }
    }
}

/// Where rows go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Delimited text file
    Csv,
    /// Parquet file
    Columnar,
    /// Column-major table returned to the caller
    #[default]
    InMemory,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "columnar" | "parquet" => Ok(OutputFormat::Columnar),
            "in-memory" | "memory" | "return" => Ok(OutputFormat::InMemory),
            _ => Err(ConfigError::InvalidValue {
                key: "output_format".to_string(),
                value: s.to_string(),
                expected: "csv, columnar, in-memory".to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Columnar => write!(f, "columnar"),
            OutputFormat::InMemory => write!(f, "in-memory"),
        }
    }
}

/// Whether an existing output file is replaced or extended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    Overwrite,
    #[default]
    Append,
}

impl FromStr for WriteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "w" | "write" | "overwrite" => Ok(WriteMode::Overwrite),
            "a" | "append" => Ok(WriteMode::Append),
            _ => Err(ConfigError::InvalidValue {
                key: "write_mode".to_string(),
                value: s.to_string(),
                expected: "write, overwrite, append".to_string(),
            }),
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Overwrite => write!(f, "overwrite"),
            WriteMode::Append => write!(f, "append"),
        }
    }
}
