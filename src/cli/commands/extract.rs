//! Extract command implementation
//!
//! Runs a single schema file against one input. Paths given on the command
//! line replace the ones in the schema's `[general]` section.

use std::path::PathBuf;

use clap::Args;

use super::exit_code_for;
use crate::core::runner::run_schema;
use crate::core::schema::{load_schema, InputFormat, OutputFormat, Schema, WriteMode};
use crate::core::sink::csv::write_table;
use crate::core::summary::RunSummary;
use crate::domain::Result;

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Schema file (TOML)
    pub schema: PathBuf,

    /// Override the input file
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override the output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the missing-path report
    #[arg(short, long)]
    pub missing: Option<PathBuf>,

    /// Override the input format (json or ndjson)
    #[arg(long)]
    pub input_format: Option<String>,

    /// Override the output format (csv, columnar or in-memory)
    #[arg(long)]
    pub output_format: Option<String>,

    /// Override the write mode (write, overwrite or append)
    #[arg(long)]
    pub write_mode: Option<String>,
}

impl ExtractArgs {
    /// Execute the extract command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(schema = %self.schema.display(), "Starting extract command");

        let schema = match self.prepare_schema() {
            Ok(schema) => schema,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load schema");
                eprintln!("Failed to load schema {}: {e}", self.schema.display());
                return Ok(exit_code_for(&e));
            }
        };

        let summary = match tokio::task::spawn_blocking(move || run_schema(&schema)).await? {
            Ok(summary) => summary,
            Err(e) => {
                tracing::error!(error = %e, "Extraction failed");
                eprintln!("Extraction failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        summary.log_summary();

        if let Some(table) = &summary.table {
            write_table(table, std::io::stdout().lock())?;
        }
        Self::print_summary(&summary);

        Ok(if summary.is_clean() { 0 } else { 1 })
    }

    /// Loads the schema and applies command-line overrides
    fn prepare_schema(&self) -> Result<Schema> {
        let mut schema = load_schema(&self.schema)?;

        if let Some(input) = &self.input {
            schema.input_path = Some(input.clone());
        }
        if let Some(output) = &self.output {
            schema.output_path = Some(output.clone());
        }
        if let Some(missing) = &self.missing {
            schema.missing_path = Some(missing.clone());
        }
        if let Some(format) = &self.input_format {
            schema.input_format = format.parse::<InputFormat>()?;
        }
        if let Some(format) = &self.output_format {
            schema.output_format = format.parse::<OutputFormat>()?;
        }
        if let Some(mode) = &self.write_mode {
            schema.write_mode = mode.parse::<WriteMode>()?;
        }

        schema.check_formats()?;
        Ok(schema)
    }

    fn print_summary(summary: &RunSummary) {
        eprintln!();
        eprintln!("📊 Extract Summary:");
        eprintln!("  Schema: {}", summary.schema);
        eprintln!("  Source: {}", summary.source);
        eprintln!("  Records Read: {}", summary.records_read);
        eprintln!("  Rows Written: {}", summary.rows_written);
        eprintln!("  Lines Skipped: {}", summary.lines_skipped);
        eprintln!("  Records Failed: {}", summary.records_failed);
        eprintln!("  Paths Discovered: {}", summary.paths_discovered);
        if let Some(output) = &summary.output {
            eprintln!("  Output: {}", output.display());
        }
        eprintln!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(schema: PathBuf) -> ExtractArgs {
        ExtractArgs {
            schema,
            input: None,
            output: None,
            missing: None,
            input_format: None,
            output_format: None,
            write_mode: None,
        }
    }

    #[test]
    fn test_overrides_replace_schema_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Patient.toml");
        std::fs::write(
            &path,
            "[general]\ninput_path = \"a.json\"\noutput_path = \"a.csv\"\n[columns]\nid = \"id\"\n",
        )
        .unwrap();

        let mut args = args(path);
        args.input = Some(PathBuf::from("b.ndjson"));
        args.input_format = Some("ndjson".to_string());
        args.output_format = Some("csv".to_string());
        args.write_mode = Some("w".to_string());

        let schema = args.prepare_schema().unwrap();
        assert_eq!(schema.input_path, Some(PathBuf::from("b.ndjson")));
        assert_eq!(schema.output_path, Some(PathBuf::from("a.csv")));
        assert_eq!(schema.input_format, InputFormat::Ndjson);
        assert_eq!(schema.output_format, OutputFormat::Csv);
        assert_eq!(schema.write_mode, WriteMode::Overwrite);
    }

    #[test]
    fn test_invalid_override_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Patient.toml");
        std::fs::write(&path, "[general]\n[columns]\nid = \"id\"\n").unwrap();

        let mut args = args(path);
        args.output_format = Some("xlsx".to_string());
        let err = args.prepare_schema().unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[tokio::test]
    async fn test_execute_writes_csv() {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("Patient.toml");
        std::fs::write(&schema, "[general]\noutput_format = \"csv\"\nwrite_mode = \"write\"\n[columns]\nid = \"id\"\n")
            .unwrap();
        let input = dir.path().join("patient.json");
        std::fs::write(&input, r#"{"resourceType": "Patient", "id": "p1"}"#).unwrap();

        let mut args = args(schema);
        args.input = Some(input);
        args.output = Some(dir.path().join("out").join("patient.csv"));

        assert_eq!(args.execute().await.unwrap(), 0);
        let written = std::fs::read_to_string(dir.path().join("out").join("patient.csv")).unwrap();
        assert_eq!(written, "\"id\"\n\"p1\"\n");
    }

    #[tokio::test]
    async fn test_execute_missing_schema() {
        let dir = TempDir::new().unwrap();
        let args = args(dir.path().join("nope.toml"));
        assert_eq!(args.execute().await.unwrap(), 2);
    }
}
