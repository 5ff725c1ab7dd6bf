//! Batch command implementation
//!
//! Routes one or more mixed FHIR input files through every schema in the
//! configured schema directory. Inputs run concurrently on blocking workers,
//! bounded by `batch.parallel_inputs`, each under its own job id.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tokio::sync::{watch, Semaphore};

use crate::config::{load_config_or_default, FlatConfig};
use crate::core::batch::{BatchConfig, BatchDriver};
use crate::core::summary::BatchSummary;
use crate::domain::{ConfigError, FlatError, JobId};

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Input files (NDJSON by default)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Override the schema directory
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Override the work directory for intermediate files
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Override the missing-path report
    #[arg(short, long)]
    pub missing: Option<PathBuf>,

    /// Job id (generated when omitted; suffixed per input when several are given)
    #[arg(long)]
    pub job_id: Option<String>,

    /// Override the number of inputs processed concurrently
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Override the input format (json or ndjson)
    #[arg(long)]
    pub input_format: Option<String>,
}

/// Outcome of one input
enum InputOutcome {
    Completed(BatchSummary),
    Failed(PathBuf, FlatError),
    Skipped(PathBuf),
}

impl BatchArgs {
    /// Execute the batch command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(inputs = self.inputs.len(), "Starting batch command");

        let config = match self.prepare_config(config_path) {
            Ok(config) => config,
            Err(message) => {
                tracing::error!(error = %message, "Configuration validation failed");
                eprintln!("Configuration validation failed: {message}");
                return Ok(2);
            }
        };

        let job_ids = match self.job_ids() {
            Ok(ids) => ids,
            Err(message) => {
                eprintln!("{message}");
                return Ok(2);
            }
        };

        let batch_config = BatchConfig::from(&config.batch);
        let driver = match tokio::task::spawn_blocking(move || BatchDriver::new(batch_config)).await? {
            Ok(driver) => Arc::new(driver),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load schemas");
                eprintln!("Failed to load schemas: {e}");
                return Ok(super::exit_code_for(&e));
            }
        };

        let semaphore = Arc::new(Semaphore::new(config.batch.parallel_inputs));
        let mut tasks = Vec::with_capacity(self.inputs.len());

        for (input, job_id) in self.inputs.iter().cloned().zip(job_ids) {
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => permit?,
                Ok(_) = shutdown_signal.wait_for(|stop| *stop) => {
                    tracing::warn!(input = %input.display(), "Shutdown requested, not starting input");
                    tasks.push(tokio::spawn(async move { InputOutcome::Skipped(input) }));
                    continue;
                }
            };
            if *shutdown_signal.borrow() {
                tasks.push(tokio::spawn(async move { InputOutcome::Skipped(input) }));
                continue;
            }

            let driver = Arc::clone(&driver);
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                let path = input.clone();
                let result =
                    tokio::task::spawn_blocking(move || driver.run_file(&input, &job_id)).await;
                match result {
                    Ok(Ok(summary)) => InputOutcome::Completed(summary),
                    Ok(Err(e)) => InputOutcome::Failed(path, e),
                    Err(e) => InputOutcome::Failed(path, FlatError::Other(e.to_string())),
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for result in futures::future::join_all(tasks).await {
            outcomes.push(result?);
        }

        Ok(Self::report(&outcomes))
    }

    /// Loads the configuration and applies command-line overrides
    fn prepare_config(&self, config_path: &str) -> Result<FlatConfig, String> {
        let mut config = load_config_or_default(config_path).map_err(|e| e.to_string())?;

        if let Some(dir) = &self.config_dir {
            config.batch.config_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.batch.output_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.batch.work_dir = dir.clone();
        }
        if let Some(path) = &self.missing {
            config.batch.missing_path = Some(path.clone());
        }
        if let Some(parallel) = self.parallel {
            config.batch.parallel_inputs = parallel;
        }
        if let Some(format) = &self.input_format {
            config.batch.input_format = format.parse().map_err(|e: ConfigError| e.to_string())?;
        }

        config.validate()?;
        Ok(config)
    }

    /// One job id per input
    fn job_ids(&self) -> Result<Vec<JobId>, String> {
        match &self.job_id {
            None => Ok(self.inputs.iter().map(|_| JobId::generate()).collect()),
            Some(id) if self.inputs.len() == 1 => Ok(vec![JobId::new(id.clone())?]),
            Some(id) => (1..=self.inputs.len())
                .map(|n| JobId::new(format!("{id}_{n}")))
                .collect(),
        }
    }

    /// Prints the per-input summaries and returns the exit code
    fn report(outcomes: &[InputOutcome]) -> i32 {
        let mut failed = 0;
        let mut partial = 0;
        let mut skipped = 0;

        println!();
        println!("📊 Batch Summary:");
        for outcome in outcomes {
            match outcome {
                InputOutcome::Completed(summary) => {
                    println!("  {} (job {})", summary.input, summary.job_id);
                    println!("    Resources Routed: {}", summary.resources_routed);
                    println!("    Resources Unmatched: {}", summary.resources_unmatched);
                    println!("    Rows Written: {}", summary.rows_written());
                    println!("    Lines Skipped: {}", summary.lines_skipped);
                    println!("    Records Failed: {}", summary.records_failed());
                    println!("    Paths Discovered: {}", summary.paths_discovered());
                    println!("    Duration: {:.2}s", summary.duration.as_secs_f64());
                    for (path, table) in &summary.tables {
                        println!("    {table} -> {}", path.display());
                    }
                    for failure in &summary.failures {
                        println!(
                            "    ⚠️  {} ({}): {}",
                            failure.resource_type,
                            failure.schema.as_deref().unwrap_or("-"),
                            failure.message
                        );
                    }
                    if !summary.is_successful() {
                        partial += 1;
                    }
                }
                InputOutcome::Failed(path, error) => {
                    println!("  ❌ {}: {error}", path.display());
                    failed += 1;
                }
                InputOutcome::Skipped(path) => {
                    println!("  ⏭️  {} not started (shutdown)", path.display());
                    skipped += 1;
                }
            }
        }
        println!();

        if failed == outcomes.len() {
            5
        } else if failed > 0 || partial > 0 || skipped > 0 {
            println!("⚠️  Batch completed with failures");
            1
        } else {
            println!("✅ Batch completed successfully!");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(inputs: Vec<PathBuf>) -> BatchArgs {
        BatchArgs {
            inputs,
            config_dir: None,
            output_dir: None,
            work_dir: None,
            missing: None,
            job_id: None,
            parallel: None,
            input_format: None,
        }
    }

    #[test]
    fn test_job_ids_per_input() {
        let mut args = args(vec![PathBuf::from("a.ndjson"), PathBuf::from("b.ndjson")]);
        args.job_id = Some("p42".to_string());
        let ids: Vec<_> = args.job_ids().unwrap().into_iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["p42_1", "p42_2"]);

        args.inputs.truncate(1);
        assert_eq!(args.job_ids().unwrap()[0].as_str(), "p42");

        args.job_id = Some("../escape".to_string());
        assert!(args.job_ids().is_err());
    }

    #[test]
    fn test_overrides_are_validated() {
        let dir = TempDir::new().unwrap();
        let missing_config = dir.path().join("fhirflat.toml");

        let mut args = args(vec![PathBuf::from("a.ndjson")]);
        args.parallel = Some(0);
        assert!(args.prepare_config(missing_config.to_str().unwrap()).is_err());

        args.parallel = Some(2);
        args.input_format = Some("json".to_string());
        let config = args.prepare_config(missing_config.to_str().unwrap()).unwrap();
        assert_eq!(config.batch.parallel_inputs, 2);
    }

    #[tokio::test]
    async fn test_execute_end_to_end() {
        let dir = TempDir::new().unwrap();
        let schemas = dir.path().join("schemas");
        std::fs::create_dir_all(&schemas).unwrap();
        std::fs::write(schemas.join("Patient.toml"), "[general]\n[columns]\nid = \"id\"\n").unwrap();
        let input = dir.path().join("bundle.ndjson");
        std::fs::write(&input, "{\"resourceType\":\"Patient\",\"id\":\"1\"}\n").unwrap();

        let mut args = args(vec![input]);
        args.config_dir = Some(schemas);
        args.output_dir = Some(dir.path().join("output"));
        args.work_dir = Some(dir.path().join("work"));
        args.job_id = Some("job-1".to_string());

        let (_tx, rx) = watch::channel(false);
        let config_path = dir.path().join("fhirflat.toml");
        let code = args.execute(config_path.to_str().unwrap(), rx).await.unwrap();
        assert_eq!(code, 0);

        let table = dir.path().join("output").join("job-1").join("patient.csv");
        assert_eq!(std::fs::read_to_string(table).unwrap(), "\"id\"\n\"1\"\n");
    }

    #[tokio::test]
    async fn test_shutdown_before_start_skips_inputs() {
        let dir = TempDir::new().unwrap();
        let schemas = dir.path().join("schemas");
        std::fs::create_dir_all(&schemas).unwrap();
        std::fs::write(schemas.join("Patient.toml"), "[general]\n[columns]\nid = \"id\"\n").unwrap();

        let mut args = args(vec![dir.path().join("a.ndjson")]);
        args.config_dir = Some(schemas);
        args.work_dir = Some(dir.path().join("work"));

        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let config_path = dir.path().join("fhirflat.toml");
        let code = args.execute(config_path.to_str().unwrap(), rx).await.unwrap();
        assert_eq!(code, 1);
    }
}
