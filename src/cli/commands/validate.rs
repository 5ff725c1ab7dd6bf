//! Validate command implementation
//!
//! Loads the application configuration and every schema in the schema
//! directory, reporting each problem without stopping at the first one.

use std::path::PathBuf;

use clap::Args;

use crate::config::load_config_or_default;
use crate::core::batch::discover_schema_files;
use crate::core::schema::load_schema;
use crate::domain::ResourceType;

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema directory (defaults to `batch.config_dir`)
    #[arg(long)]
    pub config_dir: Option<PathBuf>,
}

impl ValidateArgs {
    /// Execute the validate command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config_or_default(config_path) {
            Ok(c) => {
                println!("✅ Configuration loaded");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            println!("❌ Configuration validation failed");
            println!("   Error: {e}");
            return Ok(2);
        }

        println!("  Log Level: {}", config.application.log_level);
        println!("  Schema Directory: {}", config.batch.config_dir.display());
        println!("  Output Directory: {}", config.batch.output_dir.display());
        println!("  Work Directory: {}", config.batch.work_dir.display());
        println!("  Parallel Inputs: {}", config.batch.parallel_inputs);
        println!();

        let dir = self.config_dir.clone().unwrap_or(config.batch.config_dir);
        let files = match discover_schema_files(&dir) {
            Ok(files) => files,
            Err(e) => {
                println!("❌ Cannot read schema directory {}", dir.display());
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if files.is_empty() {
            println!("⚠️  No schemas found in {}", dir.display());
            return Ok(2);
        }

        let mut invalid = 0;
        for path in &files {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            let result = ResourceType::from_schema_stem(&stem)
                .map_err(|e| e.to_string())
                .and_then(|rt| {
                    load_schema(path)
                        .map(|schema| (rt, schema))
                        .map_err(|e| e.to_string())
                });

            match result {
                Ok((rt, schema)) => println!(
                    "✅ {} ({rt}, {} columns{})",
                    path.display(),
                    schema.columns.len(),
                    schema
                        .anchor_source()
                        .map(|a| format!(", anchor {a}"))
                        .unwrap_or_default()
                ),
                Err(e) => {
                    invalid += 1;
                    println!("❌ {}", path.display());
                    println!("   Error: {e}");
                }
            }
        }

        println!();
        if invalid == 0 {
            println!("✅ {} schemas are valid", files.len());
            Ok(0)
        } else {
            println!("❌ {invalid} of {} schemas are invalid", files.len());
            Ok(2)
        }
    }
}
