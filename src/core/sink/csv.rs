//! CSV sink
//!
//! Dialect: comma delimiter, every field quoted, backslash escape. Quotes
//! inside a field are written as `\"` and backslashes as `\\`, so a reader
//! built by [`reader_builder`] returns the original values.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use ::csv::{QuoteStyle, ReaderBuilder, Writer, WriterBuilder};

use super::{ensure_parent_dir, RowSink, SinkOutput, Table};
use crate::core::schema::WriteMode;
use crate::domain::context::ResultExt;
use crate::domain::{Result, Row};

/// Streams rows to a CSV file
pub struct CsvSink {
    writer: Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl CsvSink {
    /// Opens the output file
    ///
    /// Overwrite mode truncates the file and writes the header; append mode
    /// extends the file and writes no header.
    pub fn create(path: &Path, header: &[&str], mode: WriteMode) -> Result<Self> {
        ensure_parent_dir(path)?;

        let file = match mode {
            WriteMode::Overwrite => File::create(path),
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(path),
        }
        .with_context(|| format!("Failed to open CSV output {}", path.display()))?;

        let mut writer = writer_builder().from_writer(file);
        if mode == WriteMode::Overwrite {
            writer.write_record(header.iter().map(|name| escape_backslashes(name)))?;
        }

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }
}

impl RowSink for CsvSink {
    fn write_row(&mut self, row: &Row) -> Result<()> {
        self.writer.write_record(
            row.values()
                .iter()
                .map(|value| escape_backslashes(value.as_deref().unwrap_or_default())),
        )?;
        self.rows += 1;
        Ok(())
    }

    fn rows_written(&self) -> usize {
        self.rows
    }

    fn finish(self: Box<Self>) -> Result<SinkOutput> {
        let mut sink = *self;
        sink.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", sink.path.display()))?;
        Ok(SinkOutput::File {
            path: sink.path,
            rows: sink.rows,
        })
    }
}

/// Writer configured with the output dialect
pub fn writer_builder() -> WriterBuilder {
    let mut builder = WriterBuilder::new();
    builder
        .delimiter(b',')
        .quote_style(QuoteStyle::Always)
        .double_quote(false)
        .escape(b'\\');
    builder
}

/// Reader configured with the output dialect
pub fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(b',')
        .double_quote(false)
        .escape(Some(b'\\'));
    builder
}

/// Writes a whole table, header included, in the output dialect
pub fn write_table<W: Write>(table: &Table, out: W) -> Result<()> {
    let mut writer = writer_builder().from_writer(out);
    writer.write_record(table.column_names().iter().map(|name| escape_backslashes(name)))?;
    for index in 0..table.num_rows() {
        if let Some(row) = table.row(index) {
            writer.write_record(
                row.values()
                    .iter()
                    .map(|value| escape_backslashes(value.as_deref().unwrap_or_default())),
            )?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn escape_backslashes(field: &str) -> String {
    field.replace('\\', "\\\\")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(values: &[Option<&str>]) -> Row {
        Row::new(values.iter().map(|v| v.map(str::to_string)).collect())
    }

    #[test]
    fn test_every_field_is_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patient.csv");

        let mut sink = Box::new(CsvSink::create(&path, &["id", "city"], WriteMode::Overwrite).unwrap());
        sink.write_row(&row(&[Some("1"), None])).unwrap();
        let output = sink.finish().unwrap();
        assert_eq!(output.rows(), 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "\"id\",\"city\"\n\"1\",\"\"\n");
    }

    #[test]
    fn test_quotes_and_backslashes_are_escaped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.csv");

        let mut sink = Box::new(CsvSink::create(&path, &["note"], WriteMode::Overwrite).unwrap());
        sink.write_row(&row(&[Some(r#"say "hi" C:\tmp"#)])).unwrap();
        sink.finish().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().nth(1), Some(r#""say \"hi\" C:\\tmp""#));
    }

    #[test]
    fn test_append_mode_skips_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patient.csv");

        let mut first = Box::new(CsvSink::create(&path, &["id"], WriteMode::Overwrite).unwrap());
        first.write_row(&row(&[Some("1")])).unwrap();
        first.finish().unwrap();

        let mut second = Box::new(CsvSink::create(&path, &["id"], WriteMode::Append).unwrap());
        second.write_row(&row(&[Some("2")])).unwrap();
        assert_eq!(second.rows_written(), 1);
        second.finish().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "\"id\"\n\"1\"\n\"2\"\n");
    }

    #[test]
    fn test_overwrite_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("patient.csv");
        std::fs::write(&path, "stale\n").unwrap();

        let sink = Box::new(CsvSink::create(&path, &["id"], WriteMode::Overwrite).unwrap());
        sink.finish().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\"id\"\n");
    }

    #[test]
    fn test_write_table_to_buffer() {
        let mut table = Table::new(&["id", "city"]);
        table.push_row(&row(&[Some("1"), Some("NY")])).unwrap();
        table.push_row(&row(&[Some("2"), None])).unwrap();

        let mut out = Vec::new();
        write_table(&table, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"id\",\"city\"\n\"1\",\"NY\"\n\"2\",\"\"\n"
        );
    }
}
