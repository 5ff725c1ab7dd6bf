//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::FlatConfig;
use crate::domain::errors::ConfigError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into FlatConfig
/// 4. Applies environment variable overrides (FHIRFLAT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use fhirflat::config::loader::load_config;
///
/// let config = load_config("fhirflat.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<FlatConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()).into());
    }

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Parse {
        origin: path.display().to_string(),
        message: e.to_string(),
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: FlatConfig = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        origin: path.display().to_string(),
        message: e.to_string(),
    })?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(ConfigError::Invalid)?;

    Ok(config)
}

/// Loads configuration, falling back to defaults when the file does not exist
///
/// Environment overrides still apply to the defaults, so a deployment can be
/// configured purely through `FHIRFLAT_*` variables.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<FlatConfig> {
    let path = path.as_ref();
    if path.exists() {
        return load_config(path);
    }

    tracing::debug!(path = %path.display(), "Config file not found, using defaults");
    let mut config = FlatConfig::default();
    apply_env_overrides(&mut config)?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced environment variable that is
/// not set
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ConfigError::Invalid(format!("env placeholder pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(ConfigError::MissingEnvVars(missing_vars.join(", ")).into());
    }

    let mut result = lines.join("\n");
    if input.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

/// Applies environment variable overrides using FHIRFLAT_* prefix
///
/// Environment variables follow the pattern: FHIRFLAT_<SECTION>_<KEY>
/// For example: FHIRFLAT_BATCH_OUTPUT_DIR, FHIRFLAT_APPLICATION_LOG_LEVEL
fn apply_env_overrides(config: &mut FlatConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("FHIRFLAT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Batch overrides
    if let Ok(val) = std::env::var("FHIRFLAT_BATCH_CONFIG_DIR") {
        config.batch.config_dir = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("FHIRFLAT_BATCH_OUTPUT_DIR") {
        config.batch.output_dir = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("FHIRFLAT_BATCH_WORK_DIR") {
        config.batch.work_dir = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("FHIRFLAT_BATCH_MISSING_PATH") {
        config.batch.missing_path = Some(PathBuf::from(val));
    }
    if let Ok(val) = std::env::var("FHIRFLAT_BATCH_PARALLEL_INPUTS") {
        if let Ok(parallel) = val.parse() {
            config.batch.parallel_inputs = parallel;
        }
    }
    if let Ok(val) = std::env::var("FHIRFLAT_BATCH_INPUT_FORMAT") {
        config.batch.input_format = val.parse()?;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("FHIRFLAT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("FHIRFLAT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("FHIRFLAT_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}
