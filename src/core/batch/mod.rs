//! Batch driver
//!
//! Routes a mixed stream of FHIR resources to every schema in a directory.
//! Schemas are grouped by base resource type (`Patient_address.toml` runs
//! with the `Patient` group). The input is split once into per-type
//! intermediate NDJSON files, then every schema of a group runs against its
//! group's file and writes `<output_dir>/<job_id>/<table>.csv`.
//!
//! A failure inside one group is recorded in the summary and the remaining
//! groups still run.

pub mod intermediate;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde_json::Value;

use crate::config::BatchSettings;
use crate::core::runner::{parse_record, run_schema_reader, strip_bom, trim_line};
use crate::core::schema::{load_schema, InputFormat, OutputFormat, Schema, WriteMode};
use crate::core::summary::{BatchSummary, GroupFailure};
use crate::domain::context::ResultExt;
use crate::domain::{ConfigError, JobId, ResourceType, Result, TableName};
use crate::{log_error_with_context, log_record_skipped};

pub use intermediate::IntermediateFile;

/// Directories and defaults for one batch driver
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory holding `*.toml` schemas
    pub config_dir: PathBuf,

    /// Root of the per-job output directories
    pub output_dir: PathBuf,

    /// Scratch directory for intermediate files
    pub work_dir: PathBuf,

    /// Missing-path report used by schemas that do not name their own
    pub missing_path: Option<PathBuf>,

    /// Format of the batch input
    pub input_format: InputFormat,
}

impl From<&BatchSettings> for BatchConfig {
    fn from(settings: &BatchSettings) -> Self {
        Self {
            config_dir: settings.config_dir.clone(),
            output_dir: settings.output_dir.clone(),
            work_dir: settings.work_dir.clone(),
            missing_path: settings.missing_path.clone(),
            input_format: settings.input_format,
        }
    }
}

/// A schema together with its output table name
#[derive(Debug, Clone)]
pub struct GroupedSchema {
    pub table: TableName,
    pub schema: Schema,
}

/// Batch driver over one schema directory
///
/// Schemas are loaded once in [`BatchDriver::new`]; the driver can then run
/// any number of inputs, each under its own job id.
#[derive(Debug)]
pub struct BatchDriver {
    config: BatchConfig,
    groups: BTreeMap<ResourceType, Vec<GroupedSchema>>,
    load_failures: Vec<GroupFailure>,
}

impl BatchDriver {
    /// Discovers and loads the schemas in `config.config_dir`
    ///
    /// A schema that fails to load is kept as a group failure and reported
    /// by every run; the other schemas are unaffected.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema directory cannot be read.
    pub fn new(config: BatchConfig) -> Result<Self> {
        let mut groups: BTreeMap<ResourceType, Vec<GroupedSchema>> = BTreeMap::new();
        let mut load_failures = Vec::new();

        for path in discover_schema_files(&config.config_dir)? {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };

            let (resource_type, table) =
                match (ResourceType::from_schema_stem(&stem), TableName::new(&stem)) {
                    (Ok(rt), Ok(table)) => (rt, table),
                    (Err(e), _) | (_, Err(e)) => {
                        tracing::warn!(schema = %path.display(), error = %e, "Ignoring schema file");
                        continue;
                    }
                };

            match load_schema(&path) {
                Ok(schema) => groups
                    .entry(resource_type)
                    .or_default()
                    .push(GroupedSchema { table, schema }),
                Err(e) => {
                    log_error_with_context!(&e, "Failed to load schema");
                    load_failures.push(GroupFailure {
                        resource_type,
                        schema: Some(stem),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            config_dir = %config.config_dir.display(),
            groups = groups.len(),
            schemas = groups.values().map(Vec::len).sum::<usize>(),
            "Loaded schema groups"
        );

        Ok(Self {
            config,
            groups,
            load_failures,
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Resource types that have at least one schema
    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.groups.keys()
    }

    /// Schemas grouped under a resource type
    pub fn group(&self, resource_type: &ResourceType) -> Option<&[GroupedSchema]> {
        self.groups.get(resource_type).map(Vec::as_slice)
    }

    /// Runs a batch over an input file
    ///
    /// The file name identifies the input in logs, reports and `Filename:`.
    pub fn run_file(&self, input: &Path, job_id: &JobId) -> Result<BatchSummary> {
        let file = File::open(input)
            .with_context(|| format!("Failed to open batch input {}", input.display()))?;
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        self.run(BufReader::new(file), &name, job_id)
    }

    /// Runs a batch over any buffered reader
    ///
    /// # Errors
    ///
    /// Returns an error when the input cannot be read or the work directory
    /// cannot be used. Failures inside a group are returned in
    /// [`BatchSummary::failures`] instead.
    pub fn run<R: BufRead>(&self, input: R, input_name: &str, job_id: &JobId) -> Result<BatchSummary> {
        let start = Instant::now();
        let mut summary = BatchSummary::new(job_id.clone(), input_name);
        for failure in &self.load_failures {
            summary.add_failure(failure.clone());
        }

        tracing::info!(job_id = %job_id, input = %input_name, "Starting batch");

        std::fs::create_dir_all(&self.config.work_dir).with_context(|| {
            format!("Failed to create work directory {}", self.config.work_dir.display())
        })?;

        let mut split = Splitter {
            driver: self,
            job_id,
            input_name,
            files: BTreeMap::new(),
            summary: &mut summary,
        };
        split.read(input)?;
        let files = split.files;

        for (resource_type, mut file) in files {
            // `file` is dropped at the end of this iteration, removing it
            if let Err(e) = file.finish_writing() {
                summary.add_failure(GroupFailure {
                    resource_type,
                    schema: None,
                    message: e.to_string(),
                });
                continue;
            }
            self.run_group(&resource_type, &file, input_name, job_id, &mut summary);
        }

        let summary = summary.with_duration(start.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    fn run_group(
        &self,
        resource_type: &ResourceType,
        file: &IntermediateFile,
        input_name: &str,
        job_id: &JobId,
        summary: &mut BatchSummary,
    ) {
        let Some(schemas) = self.groups.get(resource_type) else {
            return;
        };

        tracing::info!(
            resource_type = %resource_type,
            records = file.records(),
            schemas = schemas.len(),
            "Running schema group"
        );

        for grouped in schemas {
            let schema = self.batch_schema(grouped, job_id);
            let output = schema.output_path.clone();

            let result = File::open(file.path())
                .with_context(|| format!("Failed to open intermediate file {}", file.path().display()))
                .and_then(|f| run_schema_reader(&schema, BufReader::new(f), input_name));

            match result {
                Ok(run) => {
                    if let Some(path) = output {
                        summary.tables.insert(path, grouped.table.clone());
                    }
                    summary.runs.push(run);
                }
                Err(e) => {
                    log_error_with_context!(&e, format!("Schema {} failed", schema.name));
                    summary.add_failure(GroupFailure {
                        resource_type: resource_type.clone(),
                        schema: Some(schema.name.clone()),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// The schema as it runs inside a batch: NDJSON in, CSV out
    fn batch_schema(&self, grouped: &GroupedSchema, job_id: &JobId) -> Schema {
        let mut schema = grouped.schema.clone();
        schema.input_format = InputFormat::Ndjson;
        schema.output_format = OutputFormat::Csv;
        schema.write_mode = WriteMode::Overwrite;
        schema.input_path = None;
        schema.output_path = Some(table_path(&self.config.output_dir, job_id, &grouped.table));
        if schema.missing_path.is_none() {
            schema.missing_path = self.config.missing_path.clone();
        }
        schema
    }
}

/// Output location of a table within a job
pub fn table_path(output_dir: &Path, job_id: &JobId, table: &TableName) -> PathBuf {
    output_dir
        .join(job_id.as_str())
        .join(format!("{}.csv", table.as_str()))
}

/// `*.toml` files directly inside `dir`, sorted by name
pub fn discover_schema_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConfigError::NotFound(dir.display().to_string()).into());
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read schema directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Collects the resources carried by one input document
///
/// Accepts `{"resource": {...}}` envelopes, bare resources and `Bundle`s,
/// whose `entry[*].resource` are unwrapped in order.
pub fn collect_resources<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    if let Some(inner) = value.get("resource").filter(|r| r.is_object()) {
        collect_resources(inner, out);
        return;
    }

    match value.get("resourceType").and_then(Value::as_str) {
        Some("Bundle") => {
            let entries = value.get("entry").and_then(Value::as_array);
            for entry in entries.into_iter().flatten() {
                if let Some(resource) = entry.get("resource") {
                    collect_resources(resource, out);
                }
            }
        }
        _ => out.push(value),
    }
}

struct Splitter<'a> {
    driver: &'a BatchDriver,
    job_id: &'a JobId,
    input_name: &'a str,
    files: BTreeMap<ResourceType, IntermediateFile>,
    summary: &'a mut BatchSummary,
}

impl Splitter<'_> {
    fn read<R: BufRead>(&mut self, mut input: R) -> Result<()> {
        match self.driver.config.input_format {
            InputFormat::Ndjson => {
                for (index, line) in input.by_ref().split(b'\n').enumerate() {
                    let line = line.with_context(|| format!("Failed to read {}", self.input_name))?;
                    let bytes = trim_line(&line, index == 0);
                    if bytes.is_empty() {
                        continue;
                    }
                    self.route_bytes(bytes, index + 1)?;
                }
            }
            InputFormat::Json => {
                let mut buffer = Vec::new();
                input
                    .read_to_end(&mut buffer)
                    .with_context(|| format!("Failed to read {}", self.input_name))?;
                self.route_bytes(strip_bom(&buffer), 1)?;
            }
        }
        Ok(())
    }

    fn route_bytes(&mut self, bytes: &[u8], line: usize) -> Result<()> {
        let document = match parse_record(bytes) {
            Ok(document) => document,
            Err(e) if !e.is_fatal() => {
                log_record_skipped!(self.input_name, line, e);
                self.summary.lines_skipped += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let mut resources = Vec::new();
        collect_resources(&document, &mut resources);
        for resource in resources {
            self.route(resource)?;
        }
        Ok(())
    }

    fn route(&mut self, resource: &Value) -> Result<()> {
        let resource_type = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .and_then(|name| ResourceType::new(name).ok())
            .filter(|rt| self.driver.groups.contains_key(rt));

        let Some(resource_type) = resource_type else {
            self.summary.resources_unmatched += 1;
            return Ok(());
        };

        let file = match self.files.entry(resource_type) {
            std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::btree_map::Entry::Vacant(entry) => {
                let file = IntermediateFile::create(
                    &self.driver.config.work_dir,
                    self.job_id,
                    entry.key(),
                )?;
                entry.insert(file)
            }
        };
        file.append(resource)?;
        self.summary.resources_routed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;
    use tempfile::TempDir;

    const PATIENT: &str = "[general]\n[columns]\nid = \"id\"\ngender = \"gender\"\n";
    const PATIENT_ADDRESS: &str =
        "[general]\nanchor = \"address\"\n[columns]\nid = \"id\"\ncity = \"Anchor:city\"\n";
    const OBSERVATION: &str = "[general]\n[columns]\nid = \"id\"\nsrc = \"Filename:\"\n";

    struct Fixture {
        dir: TempDir,
        config: BatchConfig,
    }

    fn fixture(schemas: &[(&str, &str)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("schemas");
        std::fs::create_dir_all(&config_dir).unwrap();
        for (name, body) in schemas {
            std::fs::write(config_dir.join(name), body).unwrap();
        }
        let config = BatchConfig {
            config_dir,
            output_dir: dir.path().join("output"),
            work_dir: dir.path().join("work"),
            missing_path: None,
            input_format: InputFormat::Ndjson,
        };
        Fixture { dir, config }
    }

    fn job() -> JobId {
        JobId::new("job-1").unwrap()
    }

    #[test]
    fn test_collect_resources_unwraps_envelopes_and_bundles() {
        let doc = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "1"}},
                {"fullUrl": "urn:x"},
                {"resource": {"resourceType": "Observation", "id": "o1"}}
            ]
        });
        let mut out = Vec::new();
        collect_resources(&doc, &mut out);
        let ids: Vec<_> = out.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["1", "o1"]);

        let envelope = json!({"resource": {"resourceType": "Patient", "id": "2"}});
        let mut out = Vec::new();
        collect_resources(&envelope, &mut out);
        assert_eq!(out, vec![&envelope["resource"]]);
    }

    #[test]
    fn test_schemas_group_by_base_type() {
        let fx = fixture(&[
            ("Patient.toml", PATIENT),
            ("Patient_address.toml", PATIENT_ADDRESS),
            ("Observation.toml", OBSERVATION),
            ("notes.txt", "ignored"),
        ]);
        let driver = BatchDriver::new(fx.config.clone()).unwrap();

        let types: Vec<_> = driver.resource_types().map(|rt| rt.as_str()).collect();
        assert_eq!(types, vec!["Observation", "Patient"]);

        let patient = driver.group(&ResourceType::new("Patient").unwrap()).unwrap();
        let tables: Vec<_> = patient.iter().map(|g| g.table.as_str()).collect();
        assert_eq!(tables, vec!["patient", "patient_address"]);
    }

    #[test]
    fn test_batch_routes_and_writes_tables() {
        let fx = fixture(&[
            ("Patient.toml", PATIENT),
            ("Patient_address.toml", PATIENT_ADDRESS),
            ("Observation.toml", OBSERVATION),
        ]);
        let driver = BatchDriver::new(fx.config.clone()).unwrap();

        let input = concat!(
            "{\"resource\":{\"resourceType\":\"Patient\",\"id\":\"1\",\"gender\":\"f\",",
            "\"address\":[{\"city\":\"NY\"},{\"city\":\"LA\"}]}}\n",
            "{\"resourceType\":\"Observation\",\"id\":\"o1\"}\n",
            "{\"resourceType\":\"Encounter\",\"id\":\"e1\"}\n",
            "garbage\n",
        );

        let summary = driver.run(Cursor::new(input), "bundle.ndjson", &job()).unwrap();
        assert_eq!(summary.resources_routed, 2);
        assert_eq!(summary.resources_unmatched, 1);
        assert_eq!(summary.lines_skipped, 1);
        assert!(summary.failures.is_empty());
        assert_eq!(summary.rows_written(), 4);

        let output = fx.config.output_dir.join("job-1");
        let tables: Vec<_> = summary.tables.values().map(|t| t.as_str()).collect();
        assert_eq!(tables, vec!["observation", "patient", "patient_address"]);

        let address = std::fs::read_to_string(output.join("patient_address.csv")).unwrap();
        assert_eq!(address, "\"id\",\"city\"\n\"1\",\"NY\"\n\"1\",\"LA\"\n");

        let observation = std::fs::read_to_string(output.join("observation.csv")).unwrap();
        assert_eq!(observation, "\"id\",\"src\"\n\"o1\",\"bundle.ndjson\"\n");
    }

    #[test]
    fn test_intermediate_files_are_removed() {
        let fx = fixture(&[("Patient.toml", PATIENT)]);
        let driver = BatchDriver::new(fx.config.clone()).unwrap();

        driver
            .run(Cursor::new("{\"resourceType\":\"Patient\",\"id\":\"1\"}\n"), "p.ndjson", &job())
            .unwrap();

        let leftovers = std::fs::read_dir(&fx.config.work_dir).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_broken_schema_is_an_isolated_failure() {
        let fx = fixture(&[
            ("Patient.toml", PATIENT),
            ("Observation.toml", "[general]\n[columns]\n"),
        ]);
        let driver = BatchDriver::new(fx.config.clone()).unwrap();

        let input = concat!(
            "{\"resourceType\":\"Patient\",\"id\":\"1\"}\n",
            "{\"resourceType\":\"Observation\",\"id\":\"o1\"}\n",
        );
        let summary = driver.run(Cursor::new(input), "mixed.ndjson", &job()).unwrap();

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].resource_type.as_str(), "Observation");
        assert_eq!(summary.rows_written(), 1);
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_json_bundle_input() {
        let mut fx = fixture(&[("Patient.toml", PATIENT)]);
        fx.config.input_format = InputFormat::Json;
        let driver = BatchDriver::new(fx.config.clone()).unwrap();

        let input = json!({
            "resourceType": "Bundle",
            "entry": [
                {"resource": {"resourceType": "Patient", "id": "1"}},
                {"resource": {"resourceType": "Patient", "id": "2"}}
            ]
        })
        .to_string();

        let summary = driver.run_file(&write_input(&fx, "bundle.json", &input), &job()).unwrap();
        assert_eq!(summary.input, "bundle.json");
        assert_eq!(summary.rows_written(), 2);
    }

    #[test]
    fn test_missing_config_dir() {
        let fx = fixture(&[]);
        let mut config = fx.config.clone();
        config.config_dir = fx.dir.path().join("nope");
        assert!(BatchDriver::new(config).is_err());
    }

    #[test]
    fn test_default_missing_path_applies() {
        let mut fx = fixture(&[("Patient.toml", PATIENT)]);
        let report = fx.dir.path().join("missing.csv");
        fx.config.missing_path = Some(report.clone());
        let driver = BatchDriver::new(fx.config.clone()).unwrap();

        let input = "{\"resourceType\":\"Patient\",\"id\":\"1\",\"birthDate\":\"2000\"}\n";
        let summary = driver.run(Cursor::new(input), "p.ndjson", &job()).unwrap();
        assert!(summary.paths_discovered() >= 1);

        let contents = std::fs::read_to_string(report).unwrap();
        assert!(contents.contains("\"p.ndjson\",\"birthDate\",\"\""));
    }

    fn write_input(fx: &Fixture, name: &str, body: &str) -> PathBuf {
        let path = fx.dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }
}
