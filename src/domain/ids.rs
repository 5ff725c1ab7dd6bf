//! Domain identifier types with validation
//!
//! Newtype wrappers for the names that flow between the batch driver, the
//! schema loader and the output sinks, so a table name can never be passed
//! where a resource type is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FHIR resource type (e.g. `Patient`, `Observation`)
///
/// # Examples
///
/// ```
/// use fhirflat::domain::ids::ResourceType;
/// use std::str::FromStr;
///
/// let rt = ResourceType::from_str("Patient").unwrap();
/// assert_eq!(rt.as_str(), "Patient");
/// assert!(ResourceType::from_str("not a type").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceType(String);

impl ResourceType {
    /// Creates a new ResourceType
    ///
    /// Resource type names are non-empty and purely alphanumeric.
    pub fn new(name: impl Into<String>) -> Result<Self, String> {
        let name = name.into();
        if name.is_empty() {
            return Err("Resource type cannot be empty".to_string());
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!(
                "Invalid resource type '{name}': only ASCII letters and digits are allowed"
            ));
        }
        Ok(Self(name))
    }

    /// Derives the base resource type from a schema file stem
    ///
    /// Sub-table schemas share the prefix before the first `_`, so
    /// `Patient_address` groups under `Patient`.
    pub fn from_schema_stem(stem: &str) -> Result<Self, String> {
        let base = stem.split('_').next().unwrap_or(stem);
        Self::new(base)
    }

    /// Returns the resource type as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ResourceType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Logical table name handed to the warehouse loader
///
/// Always lowercase; derived from the schema file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName(String);

impl TableName {
    /// Creates a new TableName, lowercasing the input
    pub fn new(name: impl AsRef<str>) -> Result<Self, String> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err("Table name cannot be empty".to_string());
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(format!(
                "Invalid table name '{name}': only ASCII letters, digits and '_' are allowed"
            ));
        }
        Ok(Self(name.to_lowercase()))
    }

    /// Returns the table name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Identifier namespacing one batch invocation
///
/// Intermediate and output files of concurrent invocations never collide
/// as long as their job ids differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Creates a JobId from a caller-supplied value (e.g. a patient id)
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Job ID cannot be empty".to_string());
        }
        if id.contains(['/', '\\']) || id.contains("..") {
            return Err(format!("Invalid job ID '{id}': must not contain path separators"));
        }
        Ok(Self(id))
    }

    /// Generates a fresh job id
    pub fn generate() -> Self {
        Self(format!("F2C_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Returns the job id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
