//! Diagnostic tree rendering.
//!
//! Renders a tree with type tags, parse bases and source positions, one
//! node per line. This is the inspection format behind the CLI `print`
//! command; for re-readable output use [`writer`](crate::writer).
//!
//! ```text
//! value:1:1: {type: object, size: 2,
//!     entry 0: pair {depth: 0,
//!         name: value:1:1: {type: text, "a"}
//!         value: value:1:5: {type: int, base: 10, 1}
//!     }
//!     ...
//! }
//! ```

use crate::{Pair, Value, ValueKind};
use std::fmt::Write as _;

fn push_indent(out: &mut String, depth: i32) {
    for _ in 0..depth.max(0) {
        out.push('\t');
    }
}

fn type_tag(value: &Value) -> &'static str {
    match value.kind {
        ValueKind::None => "none",
        ValueKind::Null => "null",
        ValueKind::Bool(_) => "bool",
        ValueKind::Float(_) => "float",
        ValueKind::Int { .. } => "int",
        ValueKind::Text { .. } => "text",
        ValueKind::Comment(_) => "comment",
        ValueKind::Array(_) => "array",
        ValueKind::Object(_) => "object",
    }
}

fn append_value(out: &mut String, depth: i32, value: &Value, label: &str) {
    push_indent(out, depth);
    if !label.is_empty() {
        let _ = write!(out, "{}: ", label);
    }
    let _ = write!(out, "value{}: {{type: {}", value.position(), type_tag(value));
    let mut multiline = false;
    match &value.kind {
        ValueKind::None => {}
        ValueKind::Null => {}
        ValueKind::Bool(b) => {
            let _ = write!(out, ", {}", b);
        }
        ValueKind::Float(f) => {
            let _ = write!(out, ", {}", f);
        }
        ValueKind::Int { value: v, base } => {
            let _ = write!(out, ", base: {}, {}", base, v);
        }
        ValueKind::Text { text, quoted } => {
            let _ = write!(out, ", quoted: {}, {:?}", quoted, text);
        }
        ValueKind::Comment(text) => {
            let _ = write!(out, ", {:?}", text);
        }
        ValueKind::Array(values) => {
            let _ = writeln!(out, ", size: {},", values.len());
            for (i, element) in values.iter().enumerate() {
                append_value(out, depth + 1, element, &format!("index {}", i));
            }
            multiline = true;
        }
        ValueKind::Object(pairs) => {
            let _ = writeln!(out, ", size: {},", pairs.len());
            for (i, pair) in pairs.iter().enumerate() {
                append_pair(out, depth + 1, pair, &format!("entry {}", i));
            }
            multiline = true;
        }
    }
    if multiline {
        push_indent(out, depth);
    }
    out.push_str("}\n");
}

fn append_pair(out: &mut String, depth: i32, pair: &Pair, label: &str) {
    push_indent(out, depth);
    if !label.is_empty() {
        let _ = write!(out, "{}: ", label);
    }
    let _ = writeln!(out, "pair {{depth: {},", pair.depth);
    append_value(out, depth + 1, &pair.name, "name");
    append_value(out, depth + 1, &pair.value, "value");
    push_indent(out, depth);
    out.push_str("}\n");
}

/// Renders one value with all nested nodes.
#[must_use]
pub fn value_to_string(depth: i32, value: &Value, label: &str) -> String {
    let mut out = String::new();
    append_value(&mut out, depth, value, label);
    out
}

/// Renders one pair with both sides.
#[must_use]
pub fn pair_to_string(depth: i32, pair: &Pair, label: &str) -> String {
    let mut out = String::new();
    append_pair(&mut out, depth, pair, label);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    #[test]
    fn test_scalar_dump() {
        let text = value_to_string(0, &Value::int(42), "");
        assert_eq!(text, "value: {type: int, base: 10, 42}\n");

        let text = value_to_string(0, &Value::quoted_text("x"), "lbl");
        assert_eq!(text, "lbl: value: {type: text, quoted: true, \"x\"}\n");
    }

    #[test]
    fn test_tree_dump_carries_positions() {
        let root = parse_str("t.tml", "a = 1\n").unwrap();
        let text = value_to_string(0, &root, "");
        assert!(text.starts_with("value:1:0: {type: object, size: 1,"));
        assert!(text.contains("name: value:1:1: {type: text, quoted: false, \"a\"}"));
        assert!(text.contains("value: value:1:5: {type: int, base: 10, 1}"));
    }

    #[test]
    fn test_array_dump_indexes_elements() {
        let value = Value::array(vec![Value::bool(true), Value::null()]);
        let text = value_to_string(0, &value, "");
        assert!(text.contains("index 0: value: {type: bool, true}"));
        assert!(text.contains("index 1: value: {type: null}"));
    }
}
