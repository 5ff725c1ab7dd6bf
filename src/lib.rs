// fhirflat - FHIR JSON to tabular files
// Copyright (c) 2025 fhirflat Contributors
// Licensed under the MIT License

//! # fhirflat - FHIR JSON to tabular files
//!
//! fhirflat flattens FHIR JSON resources into CSV, Parquet or in-memory
//! tables, driven by declarative per-resource schemas.
//!
//! ## Overview
//!
//! - **Path expressions** walk a record by key and index, with directives
//!   (`Hard:`, `IfEx:`, `ArrCond:`, `Left:` ...) for conditional and
//!   computed values
//! - **Anchors** fan one record out into one row per element of a list
//! - **Sinks** write rows as CSV, Parquet, or return them as a table
//! - **Auditing** reports record paths that no schema column declares
//! - **Batch runs** route a mixed stream of resources to every schema in a
//!   directory
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Path evaluation, schemas, extraction, sinks, auditing, batch
//! - [`domain`] - Identifiers, rows and error types
//! - [`config`] - Application configuration
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust
//! use fhirflat::core::extract::extract;
//! use fhirflat::core::schema::load_schema_str;
//! use fhirflat::domain::EvalContext;
//! use serde_json::json;
//!
//! let schema = load_schema_str(
//!     r#"
//! [general]
//! anchor = "address"
//!
//! [columns]
//! id = "id"
//! city = "Anchor:city"
//! "#,
//!     "Patient_address.toml",
//! )
//! .unwrap();
//!
//! let record = json!({"id": "1", "address": [{"city": "NY"}, {"city": "LA"}]});
//! let rows = extract(&record, &schema, &EvalContext::now("patients.ndjson")).unwrap();
//!
//! let cities: Vec<_> = rows.iter().map(|row| row.get(1)).collect();
//! assert_eq!(cities, vec![Some("NY"), Some("LA")]);
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`domain::Result`], whose error type
//! [`domain::FlatError`] separates record-level problems (skipped and
//! counted) from configuration and I/O failures (surfaced to the caller).

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
