//! Path expression evaluation
//!
//! Evaluation walks a borrowed record and never allocates a copy of it.
//! Directives that synthesize text (`Hard:`, `Left:`, ...) switch the cursor
//! to an owned string; every later key lookup on text is absent.

use std::borrow::Cow;

use serde_json::Value;

use super::{Directive, PathExpression, PathLine, Segment};
use crate::domain::EvalContext;

/// Value a path line resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    /// A node of the record
    Node(&'a Value),
    /// Text produced by a directive or a terminated index
    Text(String),
}

impl Resolved<'_> {
    /// Renders the value as a field string
    ///
    /// Strings are verbatim, numbers use their JSON form, booleans are
    /// `True`/`False`, objects and lists become compact JSON. `null`
    /// renders as nothing.
    pub fn render(&self) -> Option<String> {
        match self {
            Resolved::Text(text) => Some(text.clone()),
            Resolved::Node(node) => render_value(node),
        }
    }

    /// Scalar text used for equality checks and character slicing
    fn scalar_text(&self) -> Option<String> {
        match self {
            Resolved::Text(text) => Some(text.clone()),
            Resolved::Node(node) => scalar_text(node),
        }
    }
}

/// Anchor resolution as an explicit three-way variant
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorValue<'a> {
    /// Anchor path missing, `null`, or empty text: no rows
    Absent,
    /// A present non-list value: one row
    Single(Cow<'a, Value>),
    /// A list: one row per element
    Many(&'a [Value]),
}

impl<'a> AnchorValue<'a> {
    /// Resolves an anchor expression against a record
    pub fn resolve(record: &'a Value, anchor: &PathExpression, ctx: &EvalContext) -> Self {
        match resolve(record, anchor, ctx) {
            None => AnchorValue::Absent,
            Some(Resolved::Node(Value::Array(items))) => AnchorValue::Many(items.as_slice()),
            Some(Resolved::Node(node)) => AnchorValue::Single(Cow::Borrowed(node)),
            Some(Resolved::Text(text)) if text.is_empty() => AnchorValue::Absent,
            Some(Resolved::Text(text)) => AnchorValue::Single(Cow::Owned(Value::String(text))),
        }
    }

    /// Elements that each produce one row, in source order
    pub fn elements(&self) -> Vec<&Value> {
        match self {
            AnchorValue::Absent => Vec::new(),
            AnchorValue::Single(value) => vec![value.as_ref()],
            AnchorValue::Many(items) => items.iter().collect(),
        }
    }
}

/// Evaluates an expression to its field value
///
/// Every line is evaluated on its own; the non-empty results are joined
/// with a single space. `None` when no line produced anything.
pub fn evaluate(record: &Value, expression: &PathExpression, ctx: &EvalContext) -> Option<String> {
    let parts: Vec<String> = expression
        .lines()
        .iter()
        .filter_map(|line| resolve_line(record, line, ctx))
        .filter_map(|resolved| resolved.render())
        .filter(|text| !text.is_empty())
        .collect();

    let combined = parts.join(" ");
    let combined = combined.trim();
    if combined.is_empty() {
        None
    } else {
        Some(combined.to_string())
    }
}

/// Raw value of the first line that resolves to something present
pub fn resolve<'a>(
    record: &'a Value,
    expression: &PathExpression,
    ctx: &EvalContext,
) -> Option<Resolved<'a>> {
    expression
        .lines()
        .iter()
        .find_map(|line| resolve_line(record, line, ctx))
}

enum Step<'a> {
    Next(Resolved<'a>),
    Done(Resolved<'a>),
}

fn resolve_line<'a>(record: &'a Value, line: &PathLine, ctx: &EvalContext) -> Option<Resolved<'a>> {
    let mut current = Resolved::Node(record);
    for segment in line.segments() {
        match step(current, segment, ctx)? {
            Step::Next(next) => current = next,
            Step::Done(last) => return present(last),
        }
    }
    present(current)
}

fn present(resolved: Resolved<'_>) -> Option<Resolved<'_>> {
    match resolved {
        Resolved::Node(Value::Null) => None,
        other => Some(other),
    }
}

fn step<'a>(current: Resolved<'a>, segment: &Segment, ctx: &EvalContext) -> Option<Step<'a>> {
    match segment {
        Segment::Key(key) => node(current)?.as_object()?.get(key).map(|v| Step::Next(Resolved::Node(v))),
        Segment::Index { position, raw } => {
            let found = match current {
                Resolved::Node(Value::Array(items)) => list_item(items, *position),
                Resolved::Node(Value::Object(map)) => map.get(raw),
                _ => None,
            };
            Some(match found {
                Some(value) => Step::Next(Resolved::Node(value)),
                None => Step::Done(Resolved::Text(String::new())),
            })
        }
        Segment::Directive(directive) => apply(current, directive, ctx).map(Step::Next),
    }
}

fn apply<'a>(current: Resolved<'a>, directive: &Directive, ctx: &EvalContext) -> Option<Resolved<'a>> {
    match directive {
        Directive::Filename => Some(Resolved::Text(ctx.source.clone())),
        Directive::GetDate => Some(Resolved::Text(ctx.formatted_timestamp())),
        Directive::Hard { literal } => Some(Resolved::Text(literal.clone())),
        Directive::ArrJoin { key } => {
            let joined = node(current)
                .and_then(|n| n.get(key.as_str()))
                .map(join_items)
                .unwrap_or_default();
            Some(Resolved::Text(joined))
        }
        Directive::ArrNotHave { subpath } => node(current)?
            .as_array()?
            .iter()
            .find(|item| resolve_line(item, subpath, ctx).is_none())
            .map(Resolved::Node),
        Directive::ArrCond { subpath, value } => node(current)?
            .as_array()?
            .iter()
            .find(|item| {
                resolve_line(item, subpath, ctx)
                    .and_then(|r| r.scalar_text())
                    .is_some_and(|text| &text == value)
            })
            .map(Resolved::Node),
        Directive::IfEx {
            key,
            then,
            otherwise,
        } => {
            let map = node(current)?.as_object()?;
            let chosen = if map.contains_key(key) { then } else { otherwise };
            Some(Resolved::Text(chosen.clone()))
        }
        Directive::IfEq {
            key,
            value,
            then,
            otherwise,
        } => {
            let map = node(current)?.as_object()?;
            let matches = map
                .get(key)
                .and_then(scalar_text)
                .is_some_and(|text| &text == value);
            let chosen = if matches { then } else { otherwise };
            Some(Resolved::Text(chosen.clone()))
        }
        Directive::Left { key, count } => {
            let text = member_text(current, key)?;
            Some(Resolved::Text(text.chars().take(*count).collect()))
        }
        Directive::LTrim { key, count } => {
            let text = member_text(current, key)?;
            Some(Resolved::Text(text.chars().skip(*count).collect()))
        }
        Directive::TimeForm { key } => {
            let text = member_text(current, key)?;
            let cut: String = text.chars().take(19).collect();
            Some(Resolved::Text(cut.replace('T', " ")))
        }
    }
}

/// Negative positions count back from the end of the list
fn list_item(items: &[Value], position: i64) -> Option<&Value> {
    let index = if position < 0 {
        items.len().checked_sub(usize::try_from(position.unsigned_abs()).ok()?)?
    } else {
        usize::try_from(position).ok()?
    };
    items.get(index)
}

fn node(current: Resolved<'_>) -> Option<&Value> {
    match current {
        Resolved::Node(value) => Some(value),
        Resolved::Text(_) => None,
    }
}

fn member_text(current: Resolved<'_>, key: &str) -> Option<String> {
    node(current)?.as_object()?.get(key).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        _ => None,
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Object(_) | Value::Array(_) => serde_json::to_string(value).ok(),
        scalar => scalar_text(scalar),
    }
}

fn join_items(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(render_value)
            .collect::<Vec<_>>()
            .join(" "),
        other => render_value(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use test_case::test_case;

    fn ctx() -> EvalContext {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        EvalContext::new("bundle_001.ndjson", ts)
    }

    fn eval(record: &Value, text: &str) -> Option<String> {
        let expr = PathExpression::parse(text).unwrap();
        evaluate(record, &expr, &ctx())
    }

    fn patient() -> Value {
        json!({
            "resourceType": "Patient",
            "id": "p1",
            "name": [
                {"use": "old", "family": "Smith", "period": {"end": "2001"}},
                {"use": "official", "family": "Jones", "given": ["John", "Paul"]}
            ],
            "birthDate": "1980-02-03",
            "deceasedBoolean": false,
            "multipleBirthInteger": 2,
            "meta": {"lastUpdated": "2024-01-02T03:04:05.678Z"},
            "maritalStatus": null
        })
    }

    #[test_case("id", Some("p1"); "plain key")]
    #[test_case("name.1.family", Some("Jones"); "key then index")]
    #[test_case("name.1.given.1", Some("Paul"); "nested list index")]
    #[test_case("telecom.0.value", None; "absent key")]
    #[test_case("name.5.family", None; "index out of range yields empty")]
    #[test_case("id.0", None; "index on text yields empty")]
    #[test_case("maritalStatus", None; "null is absent")]
    #[test_case("deceasedBoolean", Some("False"); "boolean rendering")]
    #[test_case("name.-1.family", Some("Jones"); "negative index from the end")]
    #[test_case("name.-2.family", Some("Smith"); "negative index first element")]
    #[test_case("name.-3.family", None; "negative index out of range yields empty")]
    #[test_case("multipleBirthInteger", Some("2"); "number rendering")]
    #[test_case("name.1.given", Some(r#"["John","Paul"]"#); "list as compact json")]
    #[test_case("Hard:foo", Some("foo"); "hard literal")]
    #[test_case("Filename:", Some("bundle_001.ndjson"); "filename from context")]
    #[test_case("GetDate:", Some("2024-05-17 12:30:00"); "processing timestamp")]
    #[test_case("IfEx:birthDate|yes|no", Some("yes"); "if exists present")]
    #[test_case("IfEx:bar|yes|no", Some("no"); "if exists missing")]
    #[test_case("IfEq:resourceType|Patient|P|X", Some("P"); "if equal match")]
    #[test_case("IfEq:resourceType|Group|P|X", Some("X"); "if equal mismatch")]
    #[test_case("IfEq:missing|Group|P|X", Some("X"); "if equal missing key")]
    #[test_case("Left:birthDate|4", Some("1980"); "left")]
    #[test_case("LTrim:birthDate|5", Some("02-03"); "left trim")]
    #[test_case("Left:missing|4", None; "left on missing key")]
    #[test_case("meta.TimeForm:lastUpdated", Some("2024-01-02 03:04:05"); "time form")]
    #[test_case("name.1.ArrJoin:given", Some("John Paul"); "array join")]
    #[test_case("name.1.ArrJoin:suffix", None; "array join missing key")]
    #[test_case("name.ArrNotHave:period,end.family", Some("Jones"); "first element without subpath")]
    #[test_case("name.ArrCond:use|official.family", Some("Jones"); "first element matching")]
    #[test_case("name.ArrCond:use|nickname.family", None; "no element matching")]
    #[test_case("Hard:x.family", None; "key lookup on text")]
    fn test_directives(expression: &str, expected: Option<&str>) {
        assert_eq!(eval(&patient(), expression), expected.map(str::to_string));
    }

    #[test]
    fn test_booleans_render_capitalized() {
        let record = json!({"active": true, "flags": [true, false]});
        assert_eq!(eval(&record, "active"), Some("True".to_string()));
        assert_eq!(eval(&record, "ArrJoin:flags"), Some("True False".to_string()));
        assert_eq!(eval(&record, "IfEq:active|True|yes|no"), Some("yes".to_string()));
    }

    #[test]
    fn test_negative_index_terminates_line() {
        let record = json!({"name": [{"family": "A"}, {"family": "B"}]});
        assert_eq!(eval(&record, "name.-1.family"), Some("B".to_string()));
        assert_eq!(eval(&record, "name.-5.family\nHard:x"), Some("x".to_string()));
    }

    #[test]
    fn test_left_counts_characters() {
        let record = json!({"name": "John"});
        assert_eq!(eval(&record, "Left:name|3"), Some("Joh".to_string()));
        assert_eq!(eval(&record, "Left:name|10"), Some("John".to_string()));
    }

    #[test]
    fn test_arr_cond_on_numbers() {
        let record = json!({"items": [{"type": "A"}, {"type": "X", "v": 7}]});
        assert_eq!(eval(&record, "items.ArrCond:type|X.v"), Some("7".to_string()));
    }

    #[test]
    fn test_lines_are_joined() {
        let record = patient();
        assert_eq!(
            eval(&record, "name.1.given.0\nname.1.family"),
            Some("John Jones".to_string())
        );
        assert_eq!(
            eval(&record, "telecom.0\nname.1.family"),
            Some("Jones".to_string())
        );
        assert_eq!(eval(&record, "telecom.0\nphoto"), None);
    }

    #[test]
    fn test_numeric_object_key() {
        let record = json!({"extension": {"0": "zero"}});
        assert_eq!(eval(&record, "extension.0"), Some("zero".to_string()));
    }

    #[test]
    fn test_resolve_returns_first_present_node() {
        let record = patient();
        let expr = PathExpression::parse("telecom\nname").unwrap();
        match resolve(&record, &expr, &ctx()) {
            Some(Resolved::Node(Value::Array(items))) => assert_eq!(items.len(), 2),
            other => panic!("Expected name list, got {other:?}"),
        }
    }

    #[test]
    fn test_anchor_value_variants() {
        let record = json!({
            "address": [{"city": "NY"}, {"city": "LA"}],
            "contact": {"city": "SF"},
            "link": null
        });
        let ctx = ctx();
        let anchor = |text: &str| PathExpression::parse(text).unwrap();

        let many = AnchorValue::resolve(&record, &anchor("address"), &ctx);
        assert_eq!(many.elements().len(), 2);
        assert!(matches!(many, AnchorValue::Many(_)));

        let single = AnchorValue::resolve(&record, &anchor("contact"), &ctx);
        assert!(matches!(single, AnchorValue::Single(_)));
        assert_eq!(single.elements().len(), 1);

        assert_eq!(
            AnchorValue::resolve(&record, &anchor("telecom"), &ctx),
            AnchorValue::Absent
        );
        assert_eq!(
            AnchorValue::resolve(&record, &anchor("link"), &ctx),
            AnchorValue::Absent
        );
        assert_eq!(
            AnchorValue::resolve(&record, &anchor("address.9"), &ctx),
            AnchorValue::Absent
        );
    }
}
