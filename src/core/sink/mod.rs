//! Output sinks
//!
//! A sink consumes the rows of one schema run. CSV output streams each row
//! to disk as it arrives; in-memory and columnar output accumulate a
//! column-major [`Table`] that is materialized when the stream ends.

pub mod csv;
pub mod parquet;
pub mod table;

pub use self::csv::CsvSink;
pub use self::parquet::ParquetSink;
pub use self::table::{Table, TableSink};

use std::path::{Path, PathBuf};

use crate::core::schema::{OutputFormat, Schema, WriteMode};
use crate::domain::{ConfigError, Result, Row};

/// Destination for extracted rows
pub trait RowSink {
    /// Writes one row
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails; this is fatal for
    /// the schema run.
    fn write_row(&mut self, row: &Row) -> Result<()>;

    /// Rows accepted so far
    fn rows_written(&self) -> usize;

    /// Flushes and closes the sink
    fn finish(self: Box<Self>) -> Result<SinkOutput>;
}

/// What a finished sink produced
#[derive(Debug, Clone, PartialEq)]
pub enum SinkOutput {
    /// A file on disk
    File { path: PathBuf, rows: usize },
    /// The in-memory table, handed back to the caller
    Table(Table),
}

impl SinkOutput {
    /// Number of data rows produced
    pub fn rows(&self) -> usize {
        match self {
            SinkOutput::File { rows, .. } => *rows,
            SinkOutput::Table(table) => table.num_rows(),
        }
    }

    /// Output file path, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            SinkOutput::File { path, .. } => Some(path),
            SinkOutput::Table(_) => None,
        }
    }
}

/// Opens the sink a schema's output settings call for
///
/// # Errors
///
/// Returns a `ConfigError` if a file output has no `output_path`, or an I/O
/// error if the output file cannot be created.
pub fn open_sink(schema: &Schema) -> Result<Box<dyn RowSink>> {
    let header = schema.header();

    match schema.output_format {
        OutputFormat::InMemory => Ok(Box::new(TableSink::new(&header))),
        OutputFormat::Csv => {
            let path = required_output_path(schema)?;
            Ok(Box::new(CsvSink::create(path, &header, schema.write_mode)?))
        }
        OutputFormat::Columnar => {
            let path = required_output_path(schema)?;
            if schema.write_mode == WriteMode::Append {
                tracing::warn!(
                    schema = %schema.name,
                    path = %path.display(),
                    "Columnar output does not support append, overwriting"
                );
            }
            Ok(Box::new(ParquetSink::create(path, &header)?))
        }
    }
}

fn required_output_path(schema: &Schema) -> Result<&Path> {
    schema.output_path.as_deref().ok_or_else(|| {
        ConfigError::Invalid(format!(
            "schema '{}' writes {} output but has no output_path",
            schema.name, schema.output_format
        ))
        .into()
    })
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
