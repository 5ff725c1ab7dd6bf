//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for fhirflat using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// fhirflat - FHIR JSON to tabular files
#[derive(Parser, Debug)]
#[command(name = "fhirflat")]
#[command(version, about, long_about = None)]
#[command(author = "fhirflat Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "fhirflat.toml", env = "FHIRFLAT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "FHIRFLAT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one schema against one input
    Extract(commands::extract::ExtractArgs),

    /// Route mixed FHIR input files to every schema in a directory
    Batch(commands::batch::BatchArgs),

    /// Validate the configuration file and every schema
    Validate(commands::validate::ValidateArgs),

    /// Initialize a configuration file and a sample schema
    Init(commands::init::InitArgs),
}
