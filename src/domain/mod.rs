//! Domain models and types for fhirflat.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed names** ([`ResourceType`], [`TableName`], [`JobId`])
//! - **Extraction values** ([`Row`], [`ExtractionResult`], [`EvalContext`])
//! - **Error types** ([`FlatError`], [`ConfigError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, FlatError>`]:
//!
//! ```rust
//! use fhirflat::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let schema = fhirflat::core::schema::load_schema("Patient.toml")?;
//!     println!("{} columns", schema.columns.len());
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod errors;
pub mod ids;
pub mod result;
pub mod row;

// Re-export commonly used types for convenience
pub use errors::{ConfigError, FlatError};
pub use ids::{JobId, ResourceType, TableName};
pub use result::Result;
pub use row::{EvalContext, ExtractionResult, Row};
