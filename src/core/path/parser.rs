//! Path expression parser
//!
//! Turns expression text into [`PathExpression`] values. Errors are plain
//! strings; the schema loader attaches the column name and wraps them in a
//! `ConfigError`.

use super::{Directive, PathExpression, PathLine, Segment};

const SEGMENT_SEPARATOR: char = '.';
const ARGUMENT_SEPARATOR: char = '|';
const ESCAPED_DOT: char = ',';

impl PathExpression {
    /// Parses a (possibly multi-line) expression
    ///
    /// Blank lines are ignored, so values written as indented multi-line
    /// strings in a schema file parse the same as single-line ones.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the expression has no lines,
    /// contains an empty segment, or uses a directive with the wrong
    /// arguments.
    pub fn parse(text: &str) -> Result<Self, String> {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathLine::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if lines.is_empty() {
            return Err("expression is empty".to_string());
        }

        Ok(Self {
            source: text.trim().to_string(),
            lines,
        })
    }
}

impl PathLine {
    /// Parses a single dot-separated line
    pub fn parse(line: &str) -> Result<Self, String> {
        let segments = line
            .split(SEGMENT_SEPARATOR)
            .map(parse_segment)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("{e} in '{line}'"))?;
        Ok(Self { segments })
    }
}

fn parse_segment(segment: &str) -> Result<Segment, String> {
    if segment.is_empty() {
        return Err("empty path segment".to_string());
    }

    if let Some((name, args)) = segment.split_once(':') {
        if let Some(directive) = parse_directive(name, args)? {
            return Ok(Segment::Directive(directive));
        }
    }

    let digits = segment.strip_prefix('-').unwrap_or(segment);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        let position = segment
            .parse::<i64>()
            .map_err(|_| format!("list index '{segment}' is out of range"))?;
        return Ok(Segment::Index {
            position,
            raw: segment.to_string(),
        });
    }

    Ok(Segment::Key(segment.to_string()))
}

/// Parses `Name:args`; `Ok(None)` means the name is not a directive and the
/// segment is an ordinary key that happens to contain a colon
fn parse_directive(name: &str, args: &str) -> Result<Option<Directive>, String> {
    let directive = match name {
        "ArrJoin" => Directive::ArrJoin {
            key: required(name, args)?,
        },
        "Filename" => Directive::Filename,
        "GetDate" => Directive::GetDate,
        "ArrNotHave" => Directive::ArrNotHave {
            subpath: parse_subpath(name, args)?,
        },
        "ArrCond" => {
            let [subpath, value] = split_args::<2>(name, args)?;
            Directive::ArrCond {
                subpath: parse_subpath(name, subpath)?,
                value: unescape(value),
            }
        }
        "Hard" => Directive::Hard {
            literal: args.to_string(),
        },
        "IfEx" => {
            let [key, then, otherwise] = split_args::<3>(name, args)?;
            Directive::IfEx {
                key: required(name, key)?,
                then: then.to_string(),
                otherwise: otherwise.to_string(),
            }
        }
        "IfEq" => {
            let [key, value, then, otherwise] = split_args::<4>(name, args)?;
            Directive::IfEq {
                key: required(name, key)?,
                value: unescape(value),
                then: then.to_string(),
                otherwise: otherwise.to_string(),
            }
        }
        "Left" => {
            let [key, count] = split_args::<2>(name, args)?;
            Directive::Left {
                key: required(name, key)?,
                count: parse_count(name, count)?,
            }
        }
        "LTrim" => {
            let [key, count] = split_args::<2>(name, args)?;
            Directive::LTrim {
                key: required(name, key)?,
                count: parse_count(name, count)?,
            }
        }
        "TimeForm" => Directive::TimeForm {
            key: required(name, args)?,
        },
        _ => return Ok(None),
    };
    Ok(Some(directive))
}

fn split_args<'a, const N: usize>(name: &str, args: &'a str) -> Result<[&'a str; N], String> {
    let parts: Vec<&str> = args.split(ARGUMENT_SEPARATOR).collect();
    parts.try_into().map_err(|parts: Vec<&str>| {
        format!(
            "{name} expects {N} '|'-separated arguments, got {}",
            parts.len()
        )
    })
}

fn required(name: &str, arg: &str) -> Result<String, String> {
    if arg.is_empty() {
        return Err(format!("{name} requires a key argument"));
    }
    Ok(arg.to_string())
}

fn parse_count(name: &str, arg: &str) -> Result<usize, String> {
    arg.trim()
        .parse::<usize>()
        .map_err(|_| format!("{name} expects a non-negative character count, got '{arg}'"))
}

fn parse_subpath(name: &str, arg: &str) -> Result<PathLine, String> {
    if arg.is_empty() {
        return Err(format!("{name} requires a sub-path argument"));
    }
    PathLine::parse(&unescape(arg))
}

fn unescape(arg: &str) -> String {
    arg.replace(ESCAPED_DOT, ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_line(text: &str) -> Vec<Segment> {
        let expr = PathExpression::parse(text).unwrap();
        assert_eq!(expr.lines().len(), 1);
        expr.lines()[0].segments().to_vec()
    }

    #[test]
    fn test_plain_keys_and_indices() {
        let segments = single_line("name.0.given");
        assert_eq!(
            segments,
            vec![
                Segment::Key("name".to_string()),
                Segment::Index {
                    position: 0,
                    raw: "0".to_string()
                },
                Segment::Key("given".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_index() {
        let segments = single_line("name.-1.family");
        assert_eq!(
            segments[1],
            Segment::Index {
                position: -1,
                raw: "-1".to_string()
            }
        );
        assert_eq!(single_line("a.-")[1], Segment::Key("-".to_string()));
        assert_eq!(single_line("a.-x")[1], Segment::Key("-x".to_string()));
    }

    #[test]
    fn test_multiline_skips_blank_lines() {
        let expr = PathExpression::parse("\n  name.0.family\n\n  name.0.given.0\n").unwrap();
        assert_eq!(expr.lines().len(), 2);
        assert_eq!(
            expr.lines()[1].as_plain_path(),
            Some("name.0.given.0".to_string())
        );
    }

    #[test]
    fn test_arr_cond_unescapes_subpath_and_value() {
        let segments = single_line("coding.ArrCond:system|http://loinc,org.code");
        match &segments[1] {
            Segment::Directive(Directive::ArrCond { subpath, value }) => {
                assert_eq!(subpath.as_plain_path(), Some("system".to_string()));
                assert_eq!(value, "http://loinc.org");
            }
            other => panic!("Expected ArrCond, got {other:?}"),
        }
    }

    #[test]
    fn test_arr_not_have_nested_subpath() {
        let segments = single_line("name.ArrNotHave:period,end.family");
        match &segments[1] {
            Segment::Directive(Directive::ArrNotHave { subpath }) => {
                assert_eq!(subpath.as_plain_path(), Some("period.end".to_string()));
            }
            other => panic!("Expected ArrNotHave, got {other:?}"),
        }
    }

    #[test]
    fn test_if_eq_arguments() {
        let segments = single_line("IfEq:status|final|Y|N");
        assert_eq!(
            segments[0],
            Segment::Directive(Directive::IfEq {
                key: "status".to_string(),
                value: "final".to_string(),
                then: "Y".to_string(),
                otherwise: "N".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_prefix_is_a_key() {
        let segments = single_line("urn:oid");
        assert_eq!(segments[0], Segment::Key("urn:oid".to_string()));
    }

    #[test]
    fn test_context_directives_ignore_arguments() {
        assert_eq!(
            single_line("Filename:")[0],
            Segment::Directive(Directive::Filename)
        );
        assert_eq!(
            single_line("GetDate:")[0],
            Segment::Directive(Directive::GetDate)
        );
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(PathExpression::parse("").is_err());
        assert!(PathExpression::parse("   \n  ").is_err());
        assert!(PathExpression::parse("name..given").is_err());
        assert!(PathExpression::parse("IfEx:bar|yes").is_err());
        assert!(PathExpression::parse("IfEq:a|b|c|d|e").is_err());
        assert!(PathExpression::parse("Left:name|three").is_err());
        assert!(PathExpression::parse("ArrCond:type").is_err());
        assert!(PathExpression::parse("ArrJoin:").is_err());
        assert!(PathExpression::parse("TimeForm:").is_err());
    }

    #[test]
    fn test_plain_path_rejects_directives() {
        let expr = PathExpression::parse("Hard:x").unwrap();
        assert_eq!(expr.lines()[0].as_plain_path(), None);
    }

    #[test]
    fn test_source_is_kept() {
        let expr = PathExpression::parse("  meta.lastUpdated ").unwrap();
        assert_eq!(expr.source(), "meta.lastUpdated");
    }
}
