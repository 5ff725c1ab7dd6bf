//! Single-schema runner
//!
//! Streams an input through one schema: records are parsed, extracted,
//! written to the schema's sink and audited, in one synchronous pass.
//! A line that is not valid JSON, or a record that cannot be extracted, is
//! logged, counted and skipped; sink and report failures abort the run.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use serde_json::Value;

use crate::core::audit::{audit, MissingPathReport};
use crate::core::extract::extract;
use crate::core::schema::{InputFormat, Schema};
use crate::core::sink::{open_sink, RowSink, SinkOutput};
use crate::core::summary::RunSummary;
use crate::domain::context::ResultExt;
use crate::domain::{ConfigError, EvalContext, FlatError, Result};
use crate::{log_record_skipped, log_schema_complete, log_schema_start};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Runs a schema against its configured `input_path`
///
/// # Errors
///
/// Returns a `ConfigError` if the schema has no input path, and I/O or
/// output errors from reading the input or writing the sink.
pub fn run_schema(schema: &Schema) -> Result<RunSummary> {
    let input = schema.input_path.as_deref().ok_or_else(|| {
        ConfigError::Invalid(format!("schema '{}' has no input_path", schema.name))
    })?;
    run_schema_file(schema, input)
}

/// Runs a schema against an input file
///
/// The file name is the source identifier seen by `Filename:` and the
/// missing-path report.
pub fn run_schema_file(schema: &Schema, input: &Path) -> Result<RunSummary> {
    let file = File::open(input)
        .with_context(|| format!("Failed to open input file {}", input.display()))?;
    let source = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    run_schema_reader(schema, BufReader::new(file), &source)
}

/// Runs a schema against any buffered reader
pub fn run_schema_reader<R: BufRead>(schema: &Schema, mut reader: R, source: &str) -> Result<RunSummary> {
    log_schema_start!(schema.name, source);
    let start = Instant::now();

    let ctx = EvalContext::now(source);
    let report = schema.missing_path.as_ref().map(MissingPathReport::new);
    let mut sink = open_sink(schema)?;
    let mut summary = RunSummary::new(schema.name.clone(), source);

    let mut run = RecordRun {
        schema,
        ctx: &ctx,
        sink: sink.as_mut(),
        report: report.as_ref(),
        summary: &mut summary,
    };

    match schema.input_format {
        InputFormat::Ndjson => {
            for (index, line) in reader.by_ref().split(b'\n').enumerate() {
                let line = line.with_context(|| format!("Failed to read {source}"))?;
                let bytes = trim_line(&line, index == 0);
                if bytes.is_empty() {
                    continue;
                }
                run.process_bytes(bytes, index + 1)?;
            }
        }
        InputFormat::Json => {
            let mut buffer = Vec::new();
            reader
                .read_to_end(&mut buffer)
                .with_context(|| format!("Failed to read {source}"))?;
            run.process_bytes(strip_bom(&buffer), 1)?;
        }
    }

    match sink.finish()? {
        SinkOutput::File { path, .. } => summary.output = Some(path),
        SinkOutput::Table(table) => summary.table = Some(table),
    }

    let summary = summary.with_duration(start.elapsed());
    log_schema_complete!(schema.name, summary.rows_written, summary.duration);
    Ok(summary)
}

struct RecordRun<'a> {
    schema: &'a Schema,
    ctx: &'a EvalContext,
    sink: &'a mut dyn RowSink,
    report: Option<&'a MissingPathReport>,
    summary: &'a mut RunSummary,
}

impl RecordRun<'_> {
    fn process_bytes(&mut self, bytes: &[u8], line: usize) -> Result<()> {
        match parse_record(bytes) {
            Ok(record) => self.process_record(&record, line),
            Err(e) if !e.is_fatal() => {
                log_record_skipped!(self.ctx.source, line, e);
                self.summary.lines_skipped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn process_record(&mut self, record: &Value, line: usize) -> Result<()> {
        self.summary.records_read += 1;

        let rows = match extract(record, self.schema, self.ctx) {
            Ok(rows) => rows,
            Err(e) if !e.is_fatal() => {
                log_record_skipped!(self.ctx.source, line, e);
                self.summary.records_failed += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for row in &rows {
            self.sink.write_row(row)?;
        }
        self.summary.rows_written += rows.len();

        if let Some(report) = self.report {
            let anchor = self.schema.anchor.as_ref();
            let missing = audit(record, &self.schema.audit, anchor, self.ctx);
            self.summary.paths_discovered +=
                report.append(&self.ctx.source, &missing, self.schema.anchor_source())?;
        }

        Ok(())
    }
}

/// Parses one input document; invalid JSON is a recoverable `RecordParse`
pub(crate) fn parse_record(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|e| FlatError::RecordParse(e.to_string()))
}

pub(crate) fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

pub(crate) fn trim_line(line: &[u8], first: bool) -> &[u8] {
    let line = if first { strip_bom(line) } else { line };
    line.trim_ascii()
}
