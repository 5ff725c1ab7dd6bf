//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON-formatted local file logging with rotation
//! - Helper macros for the recurring extraction events
//!
//! # Example
//!
//! ```no_run
//! use fhirflat::logging::init_logging;
//! use fhirflat::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a schema run
///
/// # Example
///
/// ```no_run
/// use fhirflat::log_schema_start;
///
/// log_schema_start!("Patient_address", "patients.ndjson");
/// ```
#[macro_export]
macro_rules! log_schema_start {
    ($schema:expr, $source:expr) => {
        tracing::info!(
            schema = %$schema,
            source = %$source,
            "Started parsing"
        );
    };
}

/// Log the completion of a schema run
///
/// # Example
///
/// ```no_run
/// use fhirflat::log_schema_complete;
/// use std::time::Duration;
///
/// log_schema_complete!("Patient", 42, Duration::from_millis(120));
/// ```
#[macro_export]
macro_rules! log_schema_complete {
    ($schema:expr, $rows:expr, $duration:expr) => {
        tracing::info!(
            schema = %$schema,
            rows_written = $rows,
            duration_ms = $duration.as_millis() as u64,
            "Finished {}, {} rows written",
            $schema,
            $rows
        );
    };
}

/// Log a record that was skipped
///
/// # Example
///
/// ```no_run
/// use fhirflat::log_record_skipped;
///
/// log_record_skipped!("patients.ndjson", 17, "expected value at line 1 column 1");
/// ```
#[macro_export]
macro_rules! log_record_skipped {
    ($source:expr, $line:expr, $reason:expr) => {
        tracing::warn!(
            source = %$source,
            line = $line,
            reason = %$reason,
            "Skipping record"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use fhirflat::log_error_with_context;
/// use fhirflat::domain::FlatError;
///
/// let error = FlatError::Io("disk full".to_string());
/// log_error_with_context!(&error, "Failed to write output");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = %$context,
            "Error occurred"
        );
    };
}
