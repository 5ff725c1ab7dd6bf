//! Path expressions
//!
//! A path expression picks one value out of a FHIR resource. It is a list of
//! alternative *lines* (newline separated); each line is a list of
//! dot-separated *segments*. A segment is an object key, a list index, or a
//! directive of the form `Name:args` (arguments separated by `|`, with `,`
//! standing in for `.` inside sub-paths and comparison values).
//!
//! Expressions are parsed once when a schema is loaded; evaluation never
//! re-tokenizes and never fails, it only yields a value or absence.
//!
//! ```rust
//! use fhirflat::core::path::{evaluate, PathExpression};
//! use fhirflat::domain::EvalContext;
//! use serde_json::json;
//!
//! let expr = PathExpression::parse("items.ArrCond:type|X.v").unwrap();
//! let record = json!({"items": [{"type": "A"}, {"type": "X", "v": 7}]});
//! let ctx = EvalContext::now("bundle.ndjson");
//!
//! assert_eq!(evaluate(&record, &expr, &ctx), Some("7".to_string()));
//! ```

pub mod eval;
pub mod parser;

pub use eval::{evaluate, AnchorValue, Resolved};

/// A parsed, multi-line path expression
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpression {
    source: String,
    lines: Vec<PathLine>,
}

impl PathExpression {
    /// The expression text as written in the schema
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The alternative lines, in declaration order
    pub fn lines(&self) -> &[PathLine] {
        &self.lines
    }
}

/// One alternative of a path expression
#[derive(Debug, Clone, PartialEq)]
pub struct PathLine {
    segments: Vec<Segment>,
}

impl PathLine {
    /// Segments of the line, in traversal order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Dot-joined form if the line only walks keys and indices
    ///
    /// Used to derive the declared paths of a schema for drift auditing.
    pub fn as_plain_path(&self) -> Option<String> {
        let mut parts = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Key(key) => parts.push(key.as_str()),
                Segment::Index { raw, .. } => parts.push(raw.as_str()),
                Segment::Directive(_) => return None,
            }
        }
        Some(parts.join("."))
    }
}

/// One step of a path line
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Object member access
    Key(String),
    /// List index, negative from the end; `raw` is the text as written,
    /// used when the current value is an object with a numeric key
    Index { position: i64, raw: String },
    /// Transform or conditional step
    Directive(Directive),
}

/// Typed directive instruction set
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `ArrJoin:key` - space-join the list at `current[key]`
    ArrJoin { key: String },
    /// `Filename:` - source identifier from the evaluation context
    Filename,
    /// `GetDate:` - processing timestamp from the evaluation context
    GetDate,
    /// `ArrNotHave:subpath` - first list element where `subpath` is absent
    ArrNotHave { subpath: PathLine },
    /// `ArrCond:subpath|value` - first list element where `subpath` equals `value`
    ArrCond { subpath: PathLine, value: String },
    /// `Hard:literal`
    Hard { literal: String },
    /// `IfEx:key|then|else`
    IfEx {
        key: String,
        then: String,
        otherwise: String,
    },
    /// `IfEq:key|value|then|else`
    IfEq {
        key: String,
        value: String,
        then: String,
        otherwise: String,
    },
    /// `Left:key|n` - first `n` characters of `current[key]`
    Left { key: String, count: usize },
    /// `LTrim:key|n` - `current[key]` without its first `n` characters
    LTrim { key: String, count: usize },
    /// `TimeForm:key` - ISO timestamp cut to `YYYY-MM-DD HH:MM:SS`
    TimeForm { key: String },
}

impl Directive {
    /// Directive name as written before the `:`
    pub fn name(&self) -> &'static str {
        match self {
            Directive::ArrJoin { .. } => "ArrJoin",
            Directive::Filename => "Filename",
            Directive::GetDate => "GetDate",
            Directive::ArrNotHave { .. } => "ArrNotHave",
            Directive::ArrCond { .. } => "ArrCond",
            Directive::Hard { .. } => "Hard",
            Directive::IfEx { .. } => "IfEx",
            Directive::IfEq { .. } => "IfEq",
            Directive::Left { .. } => "Left",
            Directive::LTrim { .. } => "LTrim",
            Directive::TimeForm { .. } => "TimeForm",
        }
    }
}
