//! Core extraction logic for fhirflat.
//!
//! # Modules
//!
//! - [`path`] - Path expressions and directive evaluation
//! - [`schema`] - Extraction schemas and the TOML schema loader
//! - [`extract`] - Row extraction with anchor fan-out
//! - [`sink`] - CSV, Parquet and in-memory table outputs
//! - [`audit`] - Undeclared-path detection and the missing-path report
//! - [`runner`] - Streams one input through one schema
//! - [`batch`] - Routes a mixed input to every schema in a directory
//! - [`summary`] - Run and batch summaries
//!
//! # Example
//!
//! ```rust,no_run
//! use fhirflat::core::runner::run_schema;
//! use fhirflat::core::schema::load_schema;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = load_schema("schemas/Patient_address.toml")?;
//! let summary = run_schema(&schema)?;
//!
//! println!("Rows written: {}", summary.rows_written);
//! println!("Lines skipped: {}", summary.lines_skipped);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod batch;
pub mod extract;
pub mod path;
pub mod runner;
pub mod schema;
pub mod sink;
pub mod summary;
