//! Schema file loader
//!
//! Reads a TOML schema definition, substitutes `${VAR}` placeholders, parses
//! every path expression once and validates the I/O settings.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{
    AuditSpec, ColumnDef, ColumnScope, InputFormat, OutputFormat, Schema, WriteMode, ANCHOR_PREFIX,
};
use crate::config::substitute_env_vars;
use crate::core::path::PathExpression;
use crate::domain::{ConfigError, Result};

#[derive(Debug, Deserialize)]
struct RawSchema {
    general: Option<RawGeneral>,
    columns: Option<toml::Table>,
    #[serde(default)]
    audit: RawAudit,
}

#[derive(Debug, Default, Deserialize)]
struct RawGeneral {
    anchor: Option<String>,
    #[serde(alias = "inputFormat")]
    input_format: Option<String>,
    #[serde(alias = "outputFormat")]
    output_format: Option<String>,
    #[serde(alias = "writeMode")]
    write_mode: Option<String>,
    #[serde(alias = "inputPath")]
    input_path: Option<PathBuf>,
    #[serde(alias = "outputPath")]
    output_path: Option<PathBuf>,
    #[serde(alias = "missingPath")]
    missing_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAudit {
    root_paths: Option<Vec<String>>,
    anchor_paths: Option<Vec<String>>,
    #[serde(default)]
    ignore_paths: Vec<String>,
}

/// Loads a schema from a TOML file
///
/// The schema name is the file stem.
///
/// # Errors
///
/// Returns a `ConfigError` if the file is missing or unreadable, is not
/// valid TOML, lacks a `[general]` or `[columns]` section, contains a
/// malformed path expression, or pairs `ndjson` input with a non-csv output.
///
/// # Examples
///
/// ```no_run
/// use fhirflat::core::schema::load_schema;
///
/// let schema = load_schema("schemas/Patient_address.toml").unwrap();
/// println!("{:?}", schema.header());
/// ```
pub fn load_schema(path: impl AsRef<Path>) -> Result<Schema> {
    let path = path.as_ref();
    let origin = path.display().to_string();

    if !path.exists() {
        return Err(ConfigError::NotFound(origin).into());
    }

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Parse {
        origin: origin.clone(),
        message: e.to_string(),
    })?;

    let contents = substitute_env_vars(&contents)?;
    load_schema_str(&contents, &origin)
}

/// Parses a schema from TOML text
///
/// `origin` names the document in error messages; its file stem becomes
/// the schema name.
pub fn load_schema_str(text: &str, origin: &str) -> Result<Schema> {
    let raw: RawSchema = toml::from_str(text).map_err(|e| ConfigError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;

    let general = raw.general.ok_or_else(|| ConfigError::MissingSection {
        origin: origin.to_string(),
        section: "general".to_string(),
    })?;
    let column_table = raw.columns.ok_or_else(|| ConfigError::MissingSection {
        origin: origin.to_string(),
        section: "columns".to_string(),
    })?;

    let anchor = match general.anchor.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => Some(parse_expression("anchor", text)?),
    };

    let columns = parse_columns(&column_table, anchor.is_some())?;
    if columns.is_empty() {
        return Err(ConfigError::Invalid(format!("{origin} declares no columns")).into());
    }

    let input_format = parse_or_default::<InputFormat>(general.input_format.as_deref())?;
    let output_format = parse_or_default::<OutputFormat>(general.output_format.as_deref())?;
    let write_mode = parse_or_default::<WriteMode>(general.write_mode.as_deref())?;

    let audit = build_audit_spec(raw.audit, &columns);

    let schema = Schema {
        name: schema_name(origin),
        columns,
        anchor,
        input_format,
        output_format,
        write_mode,
        input_path: general.input_path,
        output_path: general.output_path,
        missing_path: general.missing_path,
        audit,
    };
    schema.check_formats()?;
    Ok(schema)
}

fn parse_columns(table: &toml::Table, anchored: bool) -> Result<Vec<ColumnDef>> {
    let mut columns = Vec::with_capacity(table.len());

    for (name, value) in table {
        let text = value.as_str().ok_or_else(|| ConfigError::InvalidValue {
            key: format!("columns.{name}"),
            value: value.type_str().to_string(),
            expected: "a path expression string".to_string(),
        })?;

        let trimmed = text.trim_start();
        let (scope, body) = match trimmed.strip_prefix(ANCHOR_PREFIX) {
            Some(rest) => (ColumnScope::Anchor, rest),
            None => (ColumnScope::Record, trimmed),
        };

        if scope == ColumnScope::Anchor && !anchored {
            return Err(ConfigError::MalformedExpression {
                column: name.clone(),
                reason: "anchor-scoped column requires [general] anchor".to_string(),
            }
            .into());
        }

        columns.push(ColumnDef {
            name: name.clone(),
            expression: parse_expression(name, body)?,
            scope,
        });
    }

    Ok(columns)
}

fn parse_expression(column: &str, text: &str) -> Result<PathExpression> {
    PathExpression::parse(text).map_err(|reason| {
        ConfigError::MalformedExpression {
            column: column.to_string(),
            reason,
        }
        .into()
    })
}

fn parse_or_default<T>(value: Option<&str>) -> Result<T>
where
    T: std::str::FromStr<Err = ConfigError> + Default,
{
    match value {
        Some(text) => Ok(text.parse()?),
        None => Ok(T::default()),
    }
}

/// Declared paths come from `[audit]` when given, otherwise from the columns
/// whose every line is a plain key/index walk
fn build_audit_spec(raw: RawAudit, columns: &[ColumnDef]) -> AuditSpec {
    let derived = |scope: ColumnScope| -> BTreeSet<String> {
        columns
            .iter()
            .filter(|c| c.scope == scope)
            .flat_map(|c| c.expression.lines().iter().filter_map(|l| l.as_plain_path()))
            .collect()
    };

    let root_paths = match raw.root_paths {
        Some(paths) => paths.into_iter().collect(),
        None => derived(ColumnScope::Record),
    };
    let anchor_paths = match raw.anchor_paths {
        Some(paths) => paths
            .iter()
            .map(|p| p.strip_prefix(ANCHOR_PREFIX).unwrap_or(p).to_string())
            .collect(),
        None => derived(ColumnScope::Anchor),
    };

    AuditSpec {
        root_paths,
        anchor_paths,
        ignore_paths: raw.ignore_paths.into_iter().collect(),
    }
}

fn schema_name(origin: &str) -> String {
    Path::new(origin)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| origin.to_string())
}
