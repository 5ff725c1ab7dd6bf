//! Columnar (Parquet) sink
//!
//! Rows are buffered in a [`Table`] and converted to a single Arrow record
//! batch of nullable UTF-8 columns when the stream ends.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::parquet::arrow::ArrowWriter;
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;

use super::{ensure_parent_dir, RowSink, SinkOutput, Table};
use crate::domain::context::ResultExt;
use crate::domain::{Result, Row};

/// Buffers rows and writes a Parquet file on `finish`
#[derive(Debug)]
pub struct ParquetSink {
    table: Table,
    path: PathBuf,
}

impl ParquetSink {
    /// Prepares a sink; the file itself is created on `finish`
    pub fn create<S: AsRef<str>>(path: &Path, header: &[S]) -> Result<Self> {
        ensure_parent_dir(path)?;
        Ok(Self {
            table: Table::new(header),
            path: path.to_path_buf(),
        })
    }
}

impl RowSink for ParquetSink {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        self.table.push_row(row)
    }

    fn rows_written(&self) -> usize {
        self.table.num_rows()
    }

    fn finish(self: Box<Self>) -> Result<SinkOutput> {
        let sink = *self;
        let rows = sink.table.num_rows();
        write_parquet(&sink.table, &sink.path)?;
        tracing::debug!(path = %sink.path.display(), rows, "Wrote parquet file");
        Ok(SinkOutput::File {
            path: sink.path,
            rows,
        })
    }
}

/// Converts a table to an Arrow record batch of nullable `Utf8` columns
pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let fields: Vec<Field> = table
        .column_names()
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();

    let arrays: Vec<ArrayRef> = table
        .columns()
        .map(|(_, values)| {
            let array: StringArray = values.iter().map(|v| v.as_deref()).collect();
            Arc::new(array) as ArrayRef
        })
        .collect();

    Ok(RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays)?)
}

/// Writes a table to a Parquet file, replacing any existing file
pub fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create parquet output {}", path.display()))?;

    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
