//! Intermediate per-type NDJSON files
//!
//! The batch driver splits its input into one file per resource type before
//! any schema runs. Each file lives in the work directory under a name that
//! includes the job id and a random suffix, and is removed when its guard is
//! dropped.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use uuid::Uuid;

use crate::domain::context::ResultExt;
use crate::domain::{FlatError, JobId, ResourceType, Result};

/// One resource type's slice of the batch input
#[derive(Debug)]
pub struct IntermediateFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    records: usize,
}

impl IntermediateFile {
    /// Creates `<work_dir>/<job_id>_<ResourceType>_<uuid>.ndjson`
    pub fn create(work_dir: &Path, job_id: &JobId, resource_type: &ResourceType) -> Result<Self> {
        let name = format!("{}_{}_{}.ndjson", job_id, resource_type, Uuid::new_v4().simple());
        let path = work_dir.join(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create intermediate file {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Created intermediate file");

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of resources appended so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Appends one resource as a single NDJSON line
    pub fn append(&mut self, resource: &Value) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(FlatError::Io(format!(
                "Intermediate file {} is already closed",
                self.path.display()
            )));
        };
        serde_json::to_writer(&mut *writer, resource)?;
        writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    /// Flushes and closes the writer so the file can be read back
    pub fn finish_writing(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .with_context(|| format!("Failed to flush intermediate file {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl Drop for IntermediateFile {
    fn drop(&mut self) {
        self.writer.take();
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed intermediate file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove intermediate file"
            ),
        }
    }
}
