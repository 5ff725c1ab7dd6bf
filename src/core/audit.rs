//! Path-diff auditor
//!
//! Detects schema drift: every concrete leaf path of a record that the
//! schema does not declare is appended to a missing-path report, one line
//! per path. The auditor never affects extraction.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::path::{AnchorValue, PathExpression};
use crate::core::schema::{AuditSpec, ANCHOR_PREFIX};
use crate::domain::context::ResultExt;
use crate::core::sink::csv::{escape_backslashes, writer_builder};
use crate::domain::{EvalContext, FlatError, Result};

/// Enumerates the concrete leaf paths of a value
///
/// Object members join with `.`, list elements contribute their index.
/// A member whose path is in `ignore` is skipped together with its subtree.
/// Empty objects and lists contribute nothing.
///
/// # Examples
///
/// ```rust
/// use fhirflat::core::audit::enumerate_leaf_paths;
/// use serde_json::json;
/// use std::collections::BTreeSet;
///
/// let record = json!({"id": "1", "name": [{"family": "Smith"}], "meta": {"v": "2"}});
/// let ignore = BTreeSet::from(["meta".to_string()]);
/// let paths: Vec<_> = enumerate_leaf_paths(&record, &ignore).into_iter().collect();
///
/// assert_eq!(paths, vec!["id", "name.0.family"]);
/// ```
pub fn enumerate_leaf_paths(value: &Value, ignore: &BTreeSet<String>) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    collect_paths(value, String::new(), ignore, &mut paths);
    paths
}

fn collect_paths(value: &Value, prefix: String, ignore: &BTreeSet<String>, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                if !ignore.contains(&path) {
                    collect_paths(child, path, ignore, out);
                }
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_paths(item, format!("{prefix}.{index}"), ignore, out);
            }
        }
        _ => {
            if !prefix.is_empty() {
                out.insert(prefix);
            }
        }
    }
}

/// Paths present in a record but not declared by the schema
///
/// Without an anchor the whole record is compared against the declared root
/// paths. With an anchor, the paths of every anchor element (relative to
/// the element) are compared against the declared anchor paths.
pub fn audit(
    record: &Value,
    spec: &AuditSpec,
    anchor: Option<&PathExpression>,
    ctx: &EvalContext,
) -> BTreeSet<String> {
    match anchor {
        None => enumerate_leaf_paths(record, &spec.ignore_paths)
            .into_iter()
            .filter(|path| !spec.root_paths.contains(path))
            .collect(),
        Some(anchor) => AnchorValue::resolve(record, anchor, ctx)
            .elements()
            .into_iter()
            .flat_map(|element| enumerate_leaf_paths(element, &spec.ignore_paths))
            .filter(|path| !spec.anchor_paths.contains(path))
            .collect(),
    }
}

/// Append-only ledger of undeclared paths
///
/// Lines are `"<source>","<path>","<anchor>"`. Anchor-relative paths are
/// written with the `Anchor:` prefix so they can be pasted into a schema.
#[derive(Debug, Clone)]
pub struct MissingPathReport {
    path: PathBuf,
}

impl MissingPathReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line per discovered path
    ///
    /// Returns the number of lines written. Nothing is opened when `paths`
    /// is empty.
    pub fn append(&self, source: &str, paths: &BTreeSet<String>, anchor: Option<&str>) -> Result<usize> {
        if paths.is_empty() {
            return Ok(0);
        }

        let mut writer = writer_builder().from_writer(Vec::new());
        for path in paths {
            let (path, anchor) = match anchor {
                Some(anchor) => (format!("{ANCHOR_PREFIX}{path}"), anchor),
                None => (path.clone(), ""),
            };
            writer.write_record([source, path.as_str(), anchor].map(escape_backslashes))?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|e| FlatError::Output(format!("CSV: {}", e.error())))?;

        crate::core::sink::ensure_parent_dir(&self.path)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open missing-path report {}", self.path.display()))?;
        // One write per call keeps lines from concurrent runs intact
        file.write_all(&buffer)?;

        Ok(paths.len())
    }
}
