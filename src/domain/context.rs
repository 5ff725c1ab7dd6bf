//! Error context extension trait
//!
//! This module provides a context extension trait similar to `anyhow::Context`
//! that works with `Result<T, FlatError>`. Unlike `anyhow`, the error kind is
//! kept: an I/O error with context is still a `FlatError::Io`, so the runner
//! can still tell fatal problems from skippable ones.
//!
//! # Examples
//!
//! ```rust
//! use fhirflat::domain::Result;
//! use fhirflat::domain::context::ResultExt;
//!
//! fn read_input(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_context(|| format!("Failed to read input file {path}"))
//! }
//! ```

use crate::domain::errors::{ConfigError, FlatError};
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error
    ///
    /// The context is evaluated eagerly, so use `.with_context()` if the
    /// context string is expensive to compute.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation)
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FlatError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| prefix(e.into(), &context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let context = f();
            prefix(e.into(), &context)
        })
    }
}

fn prefix(error: FlatError, context: &dyn std::fmt::Display) -> FlatError {
    match error {
        FlatError::Io(msg) => FlatError::Io(format!("{context}: {msg}")),
        FlatError::RecordParse(msg) => FlatError::RecordParse(format!("{context}: {msg}")),
        FlatError::Extraction(msg) => FlatError::Extraction(format!("{context}: {msg}")),
        FlatError::Output(msg) => FlatError::Output(format!("{context}: {msg}")),
        FlatError::Serialization(msg) => FlatError::Serialization(format!("{context}: {msg}")),
        FlatError::Config(inner) => {
            FlatError::Config(ConfigError::Invalid(format!("{context}: {inner}")))
        }
        FlatError::Other(msg) => FlatError::Other(format!("{context}: {msg}")),
    }
}
