//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file and a sample schema.

use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "fhirflat.toml")]
    pub output: String,

    /// Directory for the sample schema
    #[arg(long, default_value = "schemas")]
    pub schema_dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing fhirflat configuration");
        println!();

        let schema_path = self.schema_dir.join("Patient.toml");
        for path in [Path::new(&self.output), schema_path.as_path()] {
            if path.exists() && !self.force {
                println!("❌ File already exists: {}", path.display());
                println!("   Use --force to overwrite");
                return Ok(2);
            }
        }

        let written = fs::write(&self.output, Self::generate_config(&self.schema_dir))
            .and_then(|_| fs::create_dir_all(&self.schema_dir))
            .and_then(|_| fs::write(&schema_path, Self::generate_patient_schema()));

        match written {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!("✅ Sample schema created: {}", schema_path.display());
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your directories", self.output);
                println!("  2. Add one schema per resource table to {}", self.schema_dir.display());
                println!("  3. Validate: fhirflat validate");
                println!("  4. Run: fhirflat batch <input.ndjson>");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write files");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate the application configuration
    fn generate_config(schema_dir: &Path) -> String {
        format!(
            r#"# fhirflat configuration file
# Values may reference environment variables as ${{VAR}}.
# Every key can also be overridden with FHIRFLAT_<SECTION>_<KEY>.

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

[batch]
# Directory of *.toml schemas; Patient_address.toml runs with Patient resources
config_dir = "{}"

# Tables are written to <output_dir>/<job_id>/<table>.csv
output_dir = "output"

# Scratch space for per-resource-type intermediate files
# work_dir = "/tmp/fhirflat"

# Report of record paths no schema declares
# missing_path = "missing_paths.csv"

# Input files processed concurrently (1-64)
parallel_inputs = 4

# Framing of batch inputs: ndjson (one resource per line) or json
input_format = "ndjson"

[logging]
# JSON log files with rotation (daily, hourly, never)
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#,
            schema_dir.display()
        )
    }

    /// Generate a sample Patient schema
    fn generate_patient_schema() -> String {
        r#"# One row per Patient resource

[general]
input_format = "ndjson"
output_format = "csv"
write_mode = "write"

[columns]
id = "id"
gender = "gender"
birth_date = "birthDate"
family_name = "name.0.family"
given_name = "name.0.given.0"
deceased = """
IfEx:deceasedDateTime|Y|N"""
source_file = "Filename:"
loaded_at = "GetDate:"

[audit]
ignore_paths = ["meta", "text"]
"#
        .to_string()
    }
}
