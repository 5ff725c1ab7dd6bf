//! Run summaries and reporting
//!
//! Counters are kept separate: rows written, records read, lines skipped
//! because they were not valid JSON, records that could not be extracted,
//! and undeclared paths discovered by the auditor.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::sink::Table;
use crate::domain::ids::{JobId, ResourceType, TableName};

/// Summary of one schema run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Schema name
    pub schema: String,

    /// Source identifier (input file name)
    pub source: String,

    /// Records parsed successfully
    pub records_read: usize,

    /// Rows handed to the sink
    pub rows_written: usize,

    /// Input lines that were not valid JSON
    pub lines_skipped: usize,

    /// Records that parsed but could not be extracted
    pub records_failed: usize,

    /// Lines appended to the missing-path report
    pub paths_discovered: usize,

    /// Output file, for csv and columnar output
    pub output: Option<PathBuf>,

    /// Result table, for in-memory output
    pub table: Option<Table>,

    pub duration: Duration,
}

impl RunSummary {
    pub fn new(schema: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            source: source.into(),
            records_read: 0,
            rows_written: 0,
            lines_skipped: 0,
            records_failed: 0,
            paths_discovered: 0,
            output: None,
            table: None,
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether every input line produced its rows
    pub fn is_clean(&self) -> bool {
        self.lines_skipped == 0 && self.records_failed == 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            schema = %self.schema,
            source = %self.source,
            records_read = self.records_read,
            rows_written = self.rows_written,
            lines_skipped = self.lines_skipped,
            records_failed = self.records_failed,
            paths_discovered = self.paths_discovered,
            duration_ms = self.duration.as_millis() as u64,
            "Schema run completed"
        );
    }
}

/// A resource-type group that failed during a batch
#[derive(Debug, Clone)]
pub struct GroupFailure {
    pub resource_type: ResourceType,

    /// Schema that failed, when the failure is specific to one schema
    pub schema: Option<String>,

    pub message: String,
}

/// Summary of one batch invocation
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub job_id: JobId,

    /// Input identifier
    pub input: String,

    /// Produced table files and their logical table names
    pub tables: BTreeMap<PathBuf, TableName>,

    /// Resources routed to a schema group
    pub resources_routed: usize,

    /// Resources whose type has no schema
    pub resources_unmatched: usize,

    /// Input lines that were not valid JSON
    pub lines_skipped: usize,

    /// Per-schema results
    pub runs: Vec<RunSummary>,

    /// Isolated group failures
    pub failures: Vec<GroupFailure>,

    pub duration: Duration,
}

impl BatchSummary {
    pub fn new(job_id: JobId, input: impl Into<String>) -> Self {
        Self {
            job_id,
            input: input.into(),
            tables: BTreeMap::new(),
            resources_routed: 0,
            resources_unmatched: 0,
            lines_skipped: 0,
            runs: Vec::new(),
            failures: Vec::new(),
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Record a group failure
    pub fn add_failure(&mut self, failure: GroupFailure) {
        self.failures.push(failure);
    }

    /// Rows written across every schema
    pub fn rows_written(&self) -> usize {
        self.runs.iter().map(|r| r.rows_written).sum()
    }

    /// Records that could not be extracted, across every schema
    pub fn records_failed(&self) -> usize {
        self.runs.iter().map(|r| r.records_failed).sum()
    }

    /// Undeclared paths reported, across every schema
    pub fn paths_discovered(&self) -> usize {
        self.runs.iter().map(|r| r.paths_discovered).sum()
    }

    /// No failures and no skipped or failed records
    pub fn is_successful(&self) -> bool {
        self.failures.is_empty()
            && self.lines_skipped == 0
            && self.runs.iter().all(RunSummary::is_clean)
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            job_id = %self.job_id,
            input = %self.input,
            tables = self.tables.len(),
            resources_routed = self.resources_routed,
            resources_unmatched = self.resources_unmatched,
            rows_written = self.rows_written(),
            lines_skipped = self.lines_skipped,
            records_failed = self.records_failed(),
            paths_discovered = self.paths_discovered(),
            duration_ms = self.duration.as_millis() as u64,
            "Batch completed"
        );

        if !self.failures.is_empty() {
            tracing::warn!(
                failure_count = self.failures.len(),
                "Batch completed with failures"
            );
            for failure in &self.failures {
                tracing::warn!(
                    resource_type = %failure.resource_type,
                    schema = failure.schema.as_deref().unwrap_or("-"),
                    message = %failure.message,
                    "Group failure"
                );
            }
        }
    }
}
