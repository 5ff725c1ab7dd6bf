//! Row extraction with anchor fan-out
//!
//! Applies a [`Schema`] to one record. Without an anchor a record yields
//! exactly one row; with an anchor it yields one row per anchor element, with
//! anchor-scoped columns evaluated against the element and every other
//! column against the whole record.

use serde_json::Value;

use crate::core::path::{evaluate, AnchorValue};
use crate::core::schema::{ColumnScope, Schema};
use crate::domain::{EvalContext, ExtractionResult, FlatError, Result, Row};

/// Extracts the rows one record produces under a schema
///
/// Absent fields are `None` in the row, never an error.
///
/// # Errors
///
/// Returns `FlatError::Extraction` if the record is not a JSON object. No
/// partial rows are produced in that case.
///
/// # Examples
///
/// ```rust
/// use fhirflat::core::extract::extract;
/// use fhirflat::core::schema::load_schema_str;
/// use fhirflat::domain::EvalContext;
/// use serde_json::json;
///
/// let schema = load_schema_str(
///     "[general]\nanchor = \"address\"\n[columns]\nid = \"id\"\ncity = \"Anchor:city\"\n",
///     "Patient_address.toml",
/// ).unwrap();
/// let record = json!({"resourceType": "Patient", "id": "1",
///                     "address": [{"city": "NY"}, {"city": "LA"}]});
///
/// let rows = extract(&record, &schema, &EvalContext::now("patients.ndjson")).unwrap();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[1].get(1), Some("LA"));
/// ```
pub fn extract(record: &Value, schema: &Schema, ctx: &EvalContext) -> Result<ExtractionResult> {
    if !record.is_object() {
        return Err(FlatError::Extraction(format!(
            "record root is {}, expected an object",
            kind(record)
        )));
    }

    let Some(anchor) = &schema.anchor else {
        return Ok(vec![build_row(record, None, schema, ctx)]);
    };

    let anchor_value = AnchorValue::resolve(record, anchor, ctx);
    Ok(anchor_value
        .elements()
        .into_iter()
        .map(|element| build_row(record, Some(element), schema, ctx))
        .collect())
}

fn build_row(record: &Value, element: Option<&Value>, schema: &Schema, ctx: &EvalContext) -> Row {
    schema
        .columns
        .iter()
        .map(|column| {
            let target = match (column.scope, element) {
                (ColumnScope::Anchor, Some(element)) => element,
                _ => record,
            };
            evaluate(target, &column.expression, ctx)
        })
        .collect::<Vec<_>>()
        .into()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
