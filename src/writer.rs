//! TML serialization.
//!
//! The inverse of the parser: emits a [`Value`] tree as indented TML text
//! such that re-parsing yields an equivalent tree (modulo normalized
//! quoting).
//!
//! Output exists in two equivalent forms: a flat UTF-8 stream and the
//! structured [`TmlLine`] records (depth, line text, child lines). The flat
//! form is the structured form joined with one tab per depth level.
//!
//! ## Usage
//!
//! ```rust
//! use tml_cfg::{parse_str, writer, EmitOptions};
//!
//! let root = parse_str("demo.tml", "obj\n\ta = 1\narr = 1 3 5\n").unwrap();
//! let out = writer::value_to_string(0, &root, &EmitOptions::new()).unwrap();
//! assert_eq!(out, "obj\n\ta = 1\narr = 1 3 5\n");
//! ```

use crate::{EmitOptions, Error, Pair, Result, Value, ValueKind};
use std::io;

/// One emitted line: indentation depth, text without indentation, and the
/// lines of the nested block (empty for leaf lines).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TmlLine {
    pub depth: i32,
    pub text: String,
    pub children: Vec<TmlLine>,
}

impl TmlLine {
    fn new(depth: i32, text: impl Into<String>) -> Self {
        TmlLine {
            depth,
            text: text.into(),
            children: Vec::new(),
        }
    }
}

/// Quotes and escapes a text token if required.
///
/// A text is quoted when the source had quotes, when it is empty, contains
/// whitespace, `\` or `"`, would read back as a number, or collides with a
/// reserved literal (`true`, `false`, `null`, `[]`, `{}`).
fn text_token(text: &str, force_quotes: bool) -> String {
    if text.is_empty() {
        return "\"\"".to_string();
    }
    let mut must_be_escaped = force_quotes;
    if !must_be_escaped {
        let mut is_number = true;
        let mut seen_dot = false;
        for (i, ch) in text.char_indices() {
            if matches!(ch, ' ' | '\t' | '\n' | '\\' | '"') {
                must_be_escaped = true;
                break;
            }
            if is_number {
                if (i == 0 && (ch == '+' || ch == '-')) || ch.is_ascii_digit() {
                    continue;
                }
                if ch == '.' && !seen_dot {
                    seen_dot = true;
                    continue;
                }
                is_number = false;
            }
        }
        if is_number {
            must_be_escaped = true;
        }
    }
    if !must_be_escaped && !matches!(text, "true" | "false" | "null" | "[]" | "{}") {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Renders a scalar as its single token.
fn simple_token(value: &Value) -> Result<String> {
    match &value.kind {
        ValueKind::Null => Ok("null".to_string()),
        ValueKind::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        ValueKind::Float(f) => {
            // a dot is always included, otherwise the token would read back
            // as an int
            let mut s = format!("{}", f);
            if !s.contains('.') {
                s.push_str(".0");
            }
            Ok(s)
        }
        ValueKind::Int { value, .. } => Ok(value.to_string()),
        ValueKind::Text { text, quoted } => Ok(text_token(text, *quoted)),
        _ => Err(Error::structure(
            value.located(),
            "value cannot be rendered as a single token",
        )),
    }
}

/// Renders a value at value position: the line text plus nested block lines
/// (non-empty only for complex arrays and objects).
fn value_lines(depth: i32, value: &Value, options: &EmitOptions) -> Result<TmlLine> {
    match &value.kind {
        ValueKind::None => Ok(TmlLine::new(depth, "")),
        ValueKind::Comment(text) => Ok(TmlLine::new(depth, format!("#{}", text))),
        ValueKind::Array(values) => {
            if values.is_empty() {
                return Ok(TmlLine::new(depth, "[]"));
            }
            if !value.is_complex_array() {
                let tokens = values
                    .iter()
                    .map(simple_token)
                    .collect::<Result<Vec<_>>>()?;
                return Ok(TmlLine::new(depth, tokens.join(" ")));
            }
            let mut line = TmlLine::new(depth, "[]");
            for element in values {
                line.children.push(value_lines(depth + 1, element, options)?);
            }
            Ok(line)
        }
        ValueKind::Object(pairs) => {
            let mut line = TmlLine::new(depth, "{}");
            if !pairs.is_empty() {
                object_lines(depth + 1, pairs, options, &mut line.children)?;
            }
            Ok(line)
        }
        _ => Ok(TmlLine::new(depth, simple_token(value)?)),
    }
}

fn object_lines(
    depth: i32,
    pairs: &[Pair],
    options: &EmitOptions,
    out: &mut Vec<TmlLine>,
) -> Result<()> {
    for pair in pairs {
        out.push(pair_lines(depth, pair, options)?);
    }
    Ok(())
}

/// Renders one pair as `name[ = value]` with the nested block as children.
fn pair_lines(depth: i32, pair: &Pair, options: &EmitOptions) -> Result<TmlLine> {
    if pair.is_empty() {
        // empty lines keep their stored depth; negative depth means none
        return Ok(TmlLine::new(pair.depth, ""));
    }
    if pair.is_comment() {
        let used_depth = if pair.depth >= 0 || options.use_stored_depth {
            pair.depth
        } else {
            depth
        };
        if let ValueKind::Comment(text) = &pair.name.kind {
            return Ok(TmlLine::new(used_depth, format!("#{}", text)));
        }
    }
    if pair.name.is_object() {
        return Err(Error::structure(
            pair.name.located(),
            "a name cannot be an object",
        ));
    }

    let line_depth = if options.use_stored_depth { pair.depth } else { depth };
    let name = value_lines(line_depth, &pair.name, options)?;
    if !name.children.is_empty() {
        return Err(Error::structure(
            pair.name.located(),
            "a name must fit on a single line",
        ));
    }
    let mut line = TmlLine::new(line_depth, name.text);

    match &pair.value.kind {
        ValueKind::None => {}
        ValueKind::Object(pairs) => {
            if pairs.is_empty() {
                line.text.push_str(" = {}");
            } else {
                object_lines(depth + 1, pairs, options, &mut line.children)?;
            }
        }
        _ => {
            let rendered = value_lines(depth, &pair.value, options)?;
            line.text.push_str(" = ");
            line.text.push_str(&rendered.text);
            line.children = rendered.children;
        }
    }
    Ok(line)
}

fn push_indent(out: &mut String, count: i32) {
    for _ in 0..count.max(0) {
        out.push('\t');
    }
}

fn flatten(lines: &[TmlLine], out: &mut String) {
    for line in lines {
        push_indent(out, line.depth);
        out.push_str(&line.text);
        out.push('\n');
        flatten(&line.children, out);
    }
}

/// Serializes a value to the structured line form.
///
/// An object produces its body lines directly (the root object has no `{}`
/// marker line); any other value produces a single entry.
///
/// # Errors
///
/// Returns an error for a tree the TML syntax cannot express (an object as
/// a pair name).
pub fn value_to_lines(depth: i32, value: &Value, options: &EmitOptions) -> Result<Vec<TmlLine>> {
    match &value.kind {
        ValueKind::Object(pairs) => {
            let mut out = Vec::with_capacity(pairs.len());
            object_lines(depth, pairs, options, &mut out)?;
            Ok(out)
        }
        _ => Ok(vec![value_lines(depth, value, options)?]),
    }
}

/// Serializes a pair to the structured line form.
///
/// # Errors
///
/// Same as [`value_to_lines`].
pub fn pair_to_lines(depth: i32, pair: &Pair, options: &EmitOptions) -> Result<Vec<TmlLine>> {
    Ok(vec![pair_lines(depth, pair, options)?])
}

/// Joins structured lines into the flat text form (one tab per depth).
#[must_use]
pub fn lines_to_string(lines: &[TmlLine]) -> String {
    let mut out = String::new();
    flatten(lines, &mut out);
    out
}

/// Serializes a value as TML text.
///
/// # Errors
///
/// Same as [`value_to_lines`].
pub fn value_to_string(depth: i32, value: &Value, options: &EmitOptions) -> Result<String> {
    Ok(lines_to_string(&value_to_lines(depth, value, options)?))
}

/// Serializes one pair as TML text.
///
/// # Errors
///
/// Same as [`value_to_lines`].
pub fn pair_to_string(depth: i32, pair: &Pair, options: &EmitOptions) -> Result<String> {
    Ok(lines_to_string(&pair_to_lines(depth, pair, options)?))
}

/// Serializes a value as TML text into an [`io::Write`].
///
/// # Errors
///
/// Returns serialization errors and write failures.
pub fn value_to_writer<W: io::Write>(
    mut writer: W,
    depth: i32,
    value: &Value,
    options: &EmitOptions,
) -> Result<()> {
    let text = value_to_string(depth, value, options)?;
    writer.write_all(text.as_bytes()).map_err(Error::io)?;
    Ok(())
}

/// Renders a value on a single line without indentation.
///
/// Used wherever a value must appear inline, e.g. when the expression
/// evaluator concatenates texts.
///
/// # Errors
///
/// Returns an error for complex arrays and non-empty objects, which cannot
/// be rendered inline.
pub fn plain_value_to_string(value: &Value) -> Result<String> {
    match &value.kind {
        ValueKind::None => Ok(String::new()),
        ValueKind::Comment(text) => Ok(format!("#{}", text)),
        ValueKind::Array(values) => {
            if value.is_complex_array() {
                return Err(Error::structure(
                    value.located(),
                    "a complex array cannot be rendered on a single line",
                ));
            }
            if values.is_empty() {
                return Ok("[]".to_string());
            }
            let tokens = values
                .iter()
                .map(simple_token)
                .collect::<Result<Vec<_>>>()?;
            Ok(tokens.join(" "))
        }
        ValueKind::Object(pairs) => {
            if !pairs.is_empty() {
                return Err(Error::structure(
                    value.located(),
                    "a non-empty object cannot be rendered on a single line",
                ));
            }
            Ok("{}".to_string())
        }
        _ => simple_token(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parse_str, ParseOptions, TmlParser};

    fn emit(value: &Value) -> String {
        value_to_string(0, value, &EmitOptions::new()).unwrap()
    }

    #[test]
    fn test_quoting_rules() {
        assert_eq!(emit(&Value::object(vec![Pair::new(
            Value::text("a"),
            Value::text("plain"),
        )])), "a = plain\n");
        for reserved in ["true", "false", "null", "[]", "{}"] {
            let v = Value::object(vec![Pair::new(Value::text("a"), Value::text(reserved))]);
            assert_eq!(emit(&v), format!("a = \"{}\"\n", reserved));
        }
        let cases = [
            ("", "\"\""),
            ("two words", "\"two words\""),
            ("123", "\"123\""),
            ("-4.5", "\"-4.5\""),
            ("1.2.3", "1.2.3"),
            ("tab\there", "\"tab\\there\""),
            ("back\\slash", "\"back\\\\slash\""),
        ];
        for (text, expected) in cases {
            let v = Value::object(vec![Pair::new(Value::text("a"), Value::text(text))]);
            assert_eq!(emit(&v), format!("a = {}\n", expected));
        }
    }

    #[test]
    fn test_float_always_has_dot() {
        let v = Value::object(vec![Pair::new(Value::text("f"), Value::float(2.0))]);
        assert_eq!(emit(&v), "f = 2.0\n");
        let v = Value::object(vec![Pair::new(Value::text("f"), Value::float(0.25))]);
        assert_eq!(emit(&v), "f = 0.25\n");
    }

    #[test]
    fn test_simple_and_complex_arrays() {
        let simple = Value::object(vec![Pair::new(
            Value::text("arr"),
            Value::array(vec![Value::int(1), Value::int(3), Value::int(5)]),
        )]);
        assert_eq!(emit(&simple), "arr = 1 3 5\n");

        let complex = Value::object(vec![Pair::new(
            Value::text("arr"),
            Value::array(vec![
                Value::int(1),
                Value::array(vec![Value::int(2), Value::int(3)]),
            ]),
        )]);
        assert_eq!(emit(&complex), "arr = []\n\t1\n\t2 3\n");
    }

    #[test]
    fn test_objects() {
        let v = Value::object(vec![Pair::new(Value::text("obj"), Value::object(vec![]))]);
        assert_eq!(emit(&v), "obj = {}\n");

        let v = Value::object(vec![Pair::new(
            Value::text("obj"),
            Value::object(vec![
                Pair::new(Value::text("a"), Value::int(1)),
                Pair::new(Value::text("b"), Value::int(2)),
            ]),
        )]);
        assert_eq!(emit(&v), "obj\n\ta = 1\n\tb = 2\n");
    }

    #[test]
    fn test_comments_and_empty_lines() {
        let source = "# head\n\nobj\n\t# inner\n\ta = 1\n";
        let root = parse_str("t.tml", source).unwrap();
        assert_eq!(emit(&root), source);
    }

    #[test]
    fn test_object_name_is_an_error() {
        let bad = Value::object(vec![Pair::new(Value::object(vec![]), Value::int(1))]);
        assert!(value_to_string(0, &bad, &EmitOptions::new()).is_err());
    }

    #[test]
    fn test_structured_lines_match_flat_form() {
        let root = parse_str("t.tml", "obj\n\ta = 1\n\tsub\n\t\tb = 2\nlast = 3\n").unwrap();
        let options = EmitOptions::new();
        let lines = value_to_lines(0, &root, &options).unwrap();
        assert_eq!(
            lines_to_string(&lines),
            value_to_string(0, &root, &options).unwrap()
        );
        assert_eq!(lines[0].children.len(), 2);
        assert_eq!(lines[0].children[1].children.len(), 1);
    }

    #[test]
    fn test_stored_depth_emission() {
        let mut parser = TmlParser::from_str("t.tml", "obj\n\ta = 1\n");
        let root = parser.parse_tree(&ParseOptions::new()).unwrap();
        let stored = value_to_string(0, &root, &EmitOptions::new().with_stored_depth(true)).unwrap();
        assert_eq!(stored, "obj\n\ta = 1\n");
    }

    #[test]
    fn test_plain_value() {
        assert_eq!(plain_value_to_string(&Value::none()).unwrap(), "");
        assert_eq!(plain_value_to_string(&Value::int(7)).unwrap(), "7");
        assert_eq!(
            plain_value_to_string(&Value::comment(" c")).unwrap(),
            "# c"
        );
        assert_eq!(
            plain_value_to_string(&Value::array(vec![Value::int(1), Value::text("x")])).unwrap(),
            "1 x"
        );
        assert!(plain_value_to_string(&Value::array(vec![Value::array(vec![])])).is_err());
        assert!(
            plain_value_to_string(&Value::object(vec![Pair::new(
                Value::text("a"),
                Value::int(1)
            )]))
            .is_err()
        );
    }
}
