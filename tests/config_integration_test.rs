//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold ENV_MUTEX.

use fhirflat::config::{load_config, load_config_or_default};
use fhirflat::core::schema::InputFormat;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::{NamedTempFile, TempDir};

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("FHIRFLAT_APPLICATION_LOG_LEVEL");
    std::env::remove_var("FHIRFLAT_BATCH_OUTPUT_DIR");
    std::env::remove_var("FHIRFLAT_BATCH_PARALLEL_INPUTS");
    std::env::remove_var("FHIRFLAT_BATCH_INPUT_FORMAT");
    std::env::remove_var("TEST_FHIRFLAT_OUTPUT_ROOT");
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "debug"

[batch]
config_dir = "conf/schemas"
output_dir = "/data/tables"
work_dir = "/data/work"
missing_path = "/data/missing.csv"
parallel_inputs = 8
input_format = "json"

[logging]
local_enabled = true
local_path = "/tmp/fhirflat-logs"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.batch.config_dir, PathBuf::from("conf/schemas"));
    assert_eq!(config.batch.output_dir, PathBuf::from("/data/tables"));
    assert_eq!(config.batch.missing_path, Some(PathBuf::from("/data/missing.csv")));
    assert_eq!(config.batch.parallel_inputs, 8);
    assert_eq!(config.batch.input_format, InputFormat::Json);
    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
}

#[test]
fn test_env_substitution_and_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    std::env::set_var("TEST_FHIRFLAT_OUTPUT_ROOT", "/srv/warehouse");
    std::env::set_var("FHIRFLAT_BATCH_PARALLEL_INPUTS", "2");
    std::env::set_var("FHIRFLAT_APPLICATION_LOG_LEVEL", "warn");

    let file = write_config(
        r#"
[application]
log_level = "info"

[batch]
output_dir = "${TEST_FHIRFLAT_OUTPUT_ROOT}/tables"
parallel_inputs = 16
"#,
    );

    let config = load_config(file.path()).unwrap();
    cleanup_env_vars();

    assert_eq!(config.batch.output_dir, PathBuf::from("/srv/warehouse/tables"));
    assert_eq!(config.batch.parallel_inputs, 2);
    assert_eq!(config.application.log_level, "warn");
}

#[test]
fn test_missing_env_var_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[batch]\noutput_dir = \"${TEST_FHIRFLAT_OUTPUT_ROOT}\"\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_FHIRFLAT_OUTPUT_ROOT"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[batch]\nparallel_inputs = 0\n");
    assert!(load_config(file.path()).is_err());

    let file = write_config("[logging]\nlocal_rotation = \"size\"\n");
    assert!(load_config(file.path()).is_err());

    let file = write_config("[batch]\ninput_format = \"xml\"\n");
    assert!(load_config(file.path()).is_err());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let dir = TempDir::new().unwrap();
    let config = load_config_or_default(dir.path().join("fhirflat.toml")).unwrap();
    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.batch.config_dir, PathBuf::from("schemas"));
    assert_eq!(config.batch.input_format, InputFormat::Ndjson);

    assert!(load_config(dir.path().join("fhirflat.toml")).is_err());
}
