//! Rows and evaluation context
//!
//! A [`Row`] is what one schema produces from one record (or one anchor
//! element): an ordered list of optional strings, one per declared column.

use chrono::{Local, NaiveDateTime};

/// One output row, in column declaration order
///
/// `None` is an absent value; it is written as an empty field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row(Vec<Option<String>>);

impl Row {
    /// Creates a row from its values
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self(values)
    }

    /// Number of values (equals the schema's column count)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value at a column position
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|v| v.as_deref())
    }

    /// All values
    pub fn values(&self) -> &[Option<String>] {
        &self.0
    }

    /// Consumes the row and returns its values
    pub fn into_values(self) -> Vec<Option<String>> {
        self.0
    }
}

impl From<Vec<Option<String>>> for Row {
    fn from(values: Vec<Option<String>>) -> Self {
        Self(values)
    }
}

/// Rows produced from one record under one schema
pub type ExtractionResult = Vec<Row>;

/// Ambient inputs available to path expressions
///
/// Carries what the `Filename:` and `GetDate:` directives substitute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalContext {
    /// Identifier of the file the record came from
    pub source: String,

    /// Processing timestamp
    pub processed_at: NaiveDateTime,
}

impl EvalContext {
    /// Creates a context with an explicit timestamp
    pub fn new(source: impl Into<String>, processed_at: NaiveDateTime) -> Self {
        Self {
            source: source.into(),
            processed_at,
        }
    }

    /// Creates a context stamped with the current local time
    pub fn now(source: impl Into<String>) -> Self {
        Self::new(source, Local::now().naive_local())
    }

    /// Timestamp in the `YYYY-MM-DD HH:MM:SS` form used by `GetDate:`
    pub fn formatted_timestamp(&self) -> String {
        self.processed_at.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_row_accessors() {
        let row = Row::new(vec![Some("1".to_string()), None]);
        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some("1"));
        assert_eq!(row.get(1), None);
        assert_eq!(row.get(5), None);
    }

    #[test]
    fn test_formatted_timestamp() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        let ctx = EvalContext::new("bundle.ndjson", ts);
        assert_eq!(ctx.formatted_timestamp(), "2024-03-09 07:05:01");
    }
}
