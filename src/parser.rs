//! TML parsing.
//!
//! [`TmlParser`] turns indented, line-oriented TML text into a [`Value`]
//! tree, preserving source positions and (on request) empty lines and
//! comments.
//!
//! ## Overview
//!
//! - **Line oriented**: every line becomes one [`Pair`], either an empty
//!   record, a comment, a standalone token line, or a `name = value`
//!   assignment
//! - **Indent unit detection**: the first indented line fixes the indent
//!   character (space or tab) and its run length for the whole document
//! - **Streaming or tree**: [`TmlParser::next_entry`] hands out one pair at
//!   a time; [`TmlParser::parse_tree`] assembles the nested object tree
//!
//! ## Usage
//!
//! Most users should use the high-level functions in the crate root:
//!
//! ```rust
//! use tml_cfg::parse_str;
//!
//! let root = parse_str("demo.tml", "obj\n\ta = 1\n\tb = 2\narr = 1 3 5\n").unwrap();
//! let pairs = root.as_object().unwrap();
//! assert_eq!(pairs.len(), 2);
//! assert!(pairs[0].value.is_object());
//! assert!(pairs[1].value.is_array());
//! ```

use crate::{Error, Pair, ParseOptions, Result, Value};
use std::path::Path;
use std::sync::Arc;

/// The TML parser.
///
/// Owns its input buffer and the shared filename handle. A parser can be
/// driven entry by entry with [`TmlParser::next_entry`] or asked for the
/// whole tree with [`TmlParser::parse_tree`]; [`TmlParser::rewind`] restarts
/// reading from the first line.
pub struct TmlParser {
    filename: Arc<str>,
    source: String,
    pos: usize,
    line_number: u32,
    indent_char: Option<u8>,
    indent_len: usize,
}

/// One frame of the depth-driven assembly stack.
struct Frame {
    pairs: Vec<Pair>,
    obj_line: i32,
    obj_column: i32,
}

impl TmlParser {
    /// Creates a parser over an in-memory source.
    ///
    /// `name` is used for provenance and error messages only.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn from_str(name: &str, source: &str) -> Self {
        TmlParser {
            filename: Arc::from(name),
            source: source.to_string(),
            pos: 0,
            line_number: 0,
            indent_char: None,
            indent_len: 1,
        }
    }

    /// Creates a parser reading the whole file into memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("{}: {}", path.display(), e)))?;
        Ok(TmlParser::from_str(&path.display().to_string(), &source))
    }

    /// The filename used for provenance.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The line number of the most recently read entry (1-based).
    #[must_use]
    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// Restarts reading from the first line.
    ///
    /// The learned indent unit is kept; it belongs to the document.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.line_number = 0;
    }

    fn syntax(&self, msg: impl Into<String>) -> Error {
        Error::syntax(&self.filename, self.line_number, msg)
    }

    fn next_line(&mut self) -> Option<&str> {
        if self.pos >= self.source.len() {
            return None;
        }
        let rest = &self.source[self.pos..];
        let (line, advance) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], idx + 1),
            None => (rest, rest.len()),
        };
        self.pos += advance;
        self.line_number += 1;
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    /// Reads the next line and returns its pair plus the indentation depth,
    /// or `None` at the end of the input.
    ///
    /// Empty lines and comments are always returned here; filtering by
    /// [`ParseOptions`] happens in [`TmlParser::parse_tree`].
    ///
    /// # Errors
    ///
    /// Returns a syntax error for bad indentation, an unterminated quote, a
    /// misplaced `=` or more than one `=` on a line.
    pub fn next_entry(&mut self) -> Result<Option<(Pair, u32)>> {
        let Some(line) = self.next_line() else {
            return Ok(None);
        };
        // borrow dance: the entry scanner needs &mut self for indent state
        let line = line.to_string();
        let entry = self.parse_entry_line(&line)?;
        Ok(Some(entry))
    }

    fn parse_entry_line(&mut self, line: &str) -> Result<(Pair, u32)> {
        let line_number = self.line_number as i32;
        let bytes = line.as_bytes();
        let len = bytes.len();

        let mut pair = Pair::empty();
        pair.name.filename = Some(self.filename.clone());
        pair.name.line = line_number;
        pair.value.filename = Some(self.filename.clone());
        pair.value.line = line_number;

        // the first indented line fixes the indent unit for the document
        if self.indent_char.is_none() && len > 0 && (bytes[0] == b' ' || bytes[0] == b'\t') {
            let unit = bytes[0];
            let mut count = 1;
            while count < len && bytes[count] == unit {
                count += 1;
            }
            self.indent_char = Some(unit);
            self.indent_len = count;
        }

        let mut i = 0usize;
        let mut depth = 0u32;
        if let Some(unit) = self.indent_char {
            while i < len && bytes[i] == unit {
                i += 1;
            }
            if i % self.indent_len != 0 {
                return Err(
                    self.syntax("wrong indentation, not a multiple of the indentation unit")
                );
            }
            depth = (i / self.indent_len) as u32;
        }

        if i >= len {
            // a line with nothing but indentation
            pair.name.column = i as i32;
            pair.value.column = i as i32;
            pair.depth = depth as i32;
            return Ok((pair, depth));
        }

        match bytes[i] {
            b' ' | b'\t' => {
                return Err(
                    self.syntax("space or tab is not allowed directly after the indentation")
                );
            }
            b'=' => {
                return Err(self.syntax("= is not allowed at the beginning of a line"));
            }
            b'#' => {
                pair.name = Value::comment(&line[i + 1..]);
                pair.name.filename = Some(self.filename.clone());
                pair.name.line = line_number;
                pair.name.column = (i + 1) as i32;
                pair.value.column = len as i32;
                pair.depth = depth as i32;
                return Ok((pair, depth));
            }
            _ => {}
        }

        // one or two sides separated by a single `=`, each side a run of
        // whitespace-separated tokens
        let mut side_count = 1u32;
        let mut words: Vec<Value> = Vec::new();

        loop {
            if i >= len {
                break;
            }
            if bytes[i] == b'=' {
                i += 1;
                while i < len && (bytes[i] == b' ' || bytes[i] == b'\t') {
                    i += 1;
                }
                if i >= len {
                    return Err(self.syntax("= is not allowed at the end of a line"));
                }
                side_count += 1;
                if side_count > 2 {
                    return Err(self.syntax(
                        "only two sides are allowed for a value pair (only one = is allowed)",
                    ));
                }
                pair.name = Self::collect_side(words, &self.filename);
                pair.name.line = line_number;
                words = Vec::new();
            }

            let word_start = i;
            let value = if bytes[i] == b'"' {
                i += 1;
                let mut text = String::new();
                let mut seg_start = i;
                let mut closed = false;
                while i < len {
                    match bytes[i] {
                        b'\\' => {
                            text.push_str(&line[seg_start..i]);
                            i += 1;
                            match bytes.get(i) {
                                Some(b'\\') => text.push('\\'),
                                Some(b'"') => text.push('"'),
                                Some(b't') => text.push('\t'),
                                Some(b'n') => text.push('\n'),
                                _ => {
                                    return Err(self.syntax(
                                        "escape sequence starts with \\ but a wrong character follows",
                                    ));
                                }
                            }
                            i += 1;
                            seg_start = i;
                        }
                        b'"' => {
                            text.push_str(&line[seg_start..i]);
                            i += 1;
                            closed = true;
                            break;
                        }
                        _ => i += 1,
                    }
                }
                if !closed {
                    return Err(self.syntax("no closing \" for the end of the text"));
                }
                Value::quoted_text(text)
            } else {
                if bytes[i] == b'+' || bytes[i] == b'-' {
                    i += 1;
                }
                let mut digit_count = 0u32;
                let mut dot_count = 0u32;
                let mut is_number = true;
                while i < len && bytes[i] != b' ' && bytes[i] != b'\t' && bytes[i] != b'=' {
                    match bytes[i] {
                        b'0'..=b'9' => digit_count += 1,
                        b'.' => dot_count += 1,
                        _ => is_number = false,
                    }
                    i += 1;
                }
                let word = &line[word_start..i];
                if is_number && digit_count > 0 && dot_count == 0 {
                    // overflow wraps to the stored 32-bit width
                    let parsed = word.parse::<i64>().unwrap_or(0);
                    Value::int(parsed as i32)
                } else if is_number && digit_count > 0 && dot_count == 1 {
                    Value::float(word.parse::<f32>().unwrap_or(0.0))
                } else if word == "true" {
                    Value::bool(true)
                } else if word == "false" {
                    Value::bool(false)
                } else if word == "null" {
                    Value::null()
                } else {
                    Value::text(word)
                }
            };

            let mut value = value;
            value.filename = Some(self.filename.clone());
            value.line = line_number;
            value.column = (word_start + 1) as i32;
            words.push(value);

            while i < len && (bytes[i] == b' ' || bytes[i] == b'\t') {
                i += 1;
            }
        }

        let side = Self::collect_side(words, &self.filename);
        if side_count == 1 {
            pair.name = side;
            pair.name.line = line_number;
            pair.value.column = (i + 1) as i32;
        } else {
            pair.value = side;
            pair.value.line = line_number;
        }
        pair.depth = depth as i32;
        Ok((pair, depth))
    }

    /// A side with one token stays a scalar; two or more become an array
    /// placed at the first token's position.
    fn collect_side(mut words: Vec<Value>, filename: &Arc<str>) -> Value {
        match words.len() {
            0 => Value::none(),
            1 => words.pop().unwrap_or_default(),
            _ => {
                let (line, column) = words.first().map_or((-1, -1), |w| (w.line, w.column));
                let mut array = Value::array(words);
                array.line = line;
                array.column = column;
                array.filename = Some(filename.clone());
                array
            }
        }
    }

    /// Parses the whole input into a root object.
    ///
    /// # Errors
    ///
    /// Returns the first syntax or structure error; the partially built tree
    /// is discarded.
    pub fn parse_tree(&mut self, options: &ParseOptions) -> Result<Value> {
        self.rewind();
        let mut frames = vec![Frame {
            pairs: Vec::new(),
            obj_line: 1,
            obj_column: 0,
        }];
        let mut prev_depth = 0u32;
        let mut trailing = 0usize;

        while let Some((pair, depth)) = self.next_entry()? {
            if !pair.is_empty_or_comment() {
                if depth > prev_depth {
                    if depth > prev_depth + 1 {
                        return Err(
                            self.syntax("can't increase the depth by more than one per entry")
                        );
                    }
                    self.open_child(&mut frames, depth, trailing)?;
                    prev_depth = depth;
                } else if depth < prev_depth {
                    for _ in depth..prev_depth {
                        Self::close_child(&mut frames);
                    }
                    prev_depth = depth;
                }
                trailing = 0;
            }

            let keep = !pair.is_empty_or_comment()
                || (options.keep_empty_lines && pair.is_empty())
                || (options.keep_comments && pair.is_comment());
            if keep {
                if pair.is_empty_or_comment() {
                    trailing += 1;
                }
                if let Some(frame) = frames.last_mut() {
                    frame.pairs.push(pair);
                }
            }
        }

        while frames.len() > 1 {
            Self::close_child(&mut frames);
        }
        let root_frame = frames.pop().unwrap_or(Frame {
            pairs: Vec::new(),
            obj_line: 1,
            obj_column: 0,
        });
        let mut root = Value::object(root_frame.pairs);
        root.filename = Some(self.filename.clone());
        root.line = 1;
        root.column = 0;
        Ok(root)
    }

    /// Parses the whole input into a pair whose name is the filename.
    ///
    /// # Errors
    ///
    /// Same as [`TmlParser::parse_tree`].
    pub fn parse_named_tree(&mut self, options: &ParseOptions) -> Result<Pair> {
        let value = self.parse_tree(options)?;
        let mut pair = Pair::new(Value::text(self.filename.to_string()), value);
        pair.name.filename = Some(self.filename.clone());
        Ok(pair)
    }

    /// Starts a child object under the last content pair of the top frame.
    ///
    /// The trailing empty/comment run belongs to the child block and moves
    /// into it.
    fn open_child(&mut self, frames: &mut Vec<Frame>, depth: u32, trailing: usize) -> Result<()> {
        let indent_len = self.indent_len;
        let line_number = self.line_number as i32;
        let Some(top) = frames.last_mut() else {
            return Err(self.syntax("no parent entry exists"));
        };
        if top.pairs.is_empty() {
            return Err(self.syntax("no parent entry exists"));
        }
        if top.pairs.len() <= trailing {
            return Err(self.syntax("no parent exists apart from empty lines and comments"));
        }
        let moved = top.pairs.split_off(top.pairs.len() - trailing);
        let obj_line = moved
            .first()
            .filter(|pair| pair.name.line >= 0)
            .map_or(line_number, |pair| pair.name.line);

        let parent = match top.pairs.last() {
            Some(pair) => pair,
            None => return Err(self.syntax("no parent entry exists")),
        };
        if parent.name.is_empty() {
            return Err(self.syntax("the name of the parent is empty"));
        }
        if parent.name.is_comment() {
            return Err(self.syntax("the name of the parent is a comment, which is not allowed"));
        }
        if !parent.value.is_empty() {
            return Err(self.syntax("the value of the parent is not empty (no = allowed here)"));
        }

        frames.push(Frame {
            pairs: moved,
            obj_line,
            obj_column: (depth as usize * indent_len) as i32,
        });
        Ok(())
    }

    /// Packages the top frame into its parent pair's value.
    fn close_child(frames: &mut Vec<Frame>) {
        let Some(frame) = frames.pop() else { return };
        let Some(parent) = frames.last_mut().and_then(|f| f.pairs.last_mut()) else {
            return;
        };
        let filename = parent.name.filename.clone();
        parent.value = Value::object(frame.pairs);
        parent.value.filename = filename;
        parent.value.line = frame.obj_line;
        parent.value.column = frame.obj_column;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValueKind;

    fn parse(source: &str) -> Value {
        TmlParser::from_str("test.tml", source)
            .parse_tree(&ParseOptions::new())
            .unwrap()
    }

    fn parse_err(source: &str) -> Error {
        TmlParser::from_str("test.tml", source)
            .parse_tree(&ParseOptions::new())
            .unwrap_err()
    }

    #[test]
    fn test_scalar_classification() {
        let root = parse("a = 1\nb = 1.5\nc = true\nd = null\ne = word\nf = \"7\"\n");
        let pairs = root.as_object().unwrap();
        assert_eq!(pairs[0].value.as_i32(), Some(1));
        assert_eq!(pairs[1].value.as_f32(), Some(1.5));
        assert_eq!(pairs[2].value.as_bool(), Some(true));
        assert!(pairs[3].value.is_null());
        assert_eq!(pairs[4].value.as_str(), Some("word"));
        assert_eq!(
            pairs[5].value.kind,
            ValueKind::Text {
                text: "7".to_string(),
                quoted: true
            }
        );
    }

    #[test]
    fn test_signed_numbers() {
        let root = parse("a = -12\nb = +3\nc = -1.5\nd = -\ne = 1.2.3\n");
        let pairs = root.as_object().unwrap();
        assert_eq!(pairs[0].value.as_i32(), Some(-12));
        assert_eq!(pairs[1].value.as_i32(), Some(3));
        assert_eq!(pairs[2].value.as_f32(), Some(-1.5));
        assert_eq!(pairs[3].value.as_str(), Some("-"));
        assert_eq!(pairs[4].value.as_str(), Some("1.2.3"));
    }

    #[test]
    fn test_multi_token_sides() {
        let root = parse("arr = 1 3 5\n0.1 1.2 = a b c\n");
        let pairs = root.as_object().unwrap();
        let arr = pairs[0].value.as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[2].as_i32(), Some(5));

        assert_eq!(pairs[1].name.as_array().unwrap().len(), 2);
        assert_eq!(pairs[1].value.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_nesting_and_depth() {
        let root = parse("obj\n\ta = 1\n\tsub\n\t\tb = 2\nc = 3\n");
        let pairs = root.as_object().unwrap();
        assert_eq!(pairs.len(), 2);
        let obj = pairs[0].value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        let sub = obj[1].value.as_object().unwrap();
        assert_eq!(sub[0].value.as_i32(), Some(2));
        assert_eq!(obj[1].depth, 1);
        assert_eq!(sub[0].depth, 2);
    }

    #[test]
    fn test_comment_and_empty_records() {
        let root = parse("# top\na = 1\n\nb = 2\n");
        let pairs = root.as_object().unwrap();
        assert_eq!(pairs.len(), 4);
        assert!(pairs[0].is_comment());
        assert_eq!(pairs[0].name.kind, ValueKind::Comment(" top".to_string()));
        assert!(pairs[2].is_empty());

        let stripped = TmlParser::from_str("test.tml", "# top\na = 1\n\nb = 2\n")
            .parse_tree(&ParseOptions::values_only())
            .unwrap();
        assert_eq!(stripped.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_comment_moves_into_child_block() {
        let root = parse("obj\n# belongs to child\n\ta = 1\n");
        let pairs = root.as_object().unwrap();
        assert_eq!(pairs.len(), 1);
        let obj = pairs[0].value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj[0].is_comment());
        assert_eq!(obj[1].value.as_i32(), Some(1));
    }

    #[test]
    fn test_quoted_escapes() {
        let root = parse("a = \"x\\ty\\n\\\\z\\\"q\"\n");
        let pairs = root.as_object().unwrap();
        assert_eq!(pairs[0].value.as_str(), Some("x\ty\n\\z\"q"));
    }

    #[test]
    fn test_provenance() {
        let root = parse("a = 1\nb = 2\n");
        let pairs = root.as_object().unwrap();
        assert_eq!(pairs[1].name.line, 2);
        assert_eq!(pairs[1].name.column, 1);
        assert_eq!(pairs[1].value.column, 5);
        assert_eq!(pairs[1].name.filename.as_deref(), Some("test.tml"));
        // one shared allocation per parse
        assert!(Arc::ptr_eq(
            pairs[0].name.filename.as_ref().unwrap(),
            pairs[1].value.filename.as_ref().unwrap()
        ));
    }

    #[test]
    fn test_error_cases() {
        assert!(parse_err("= 1\n").to_string().contains("beginning"));
        assert!(parse_err("a =\n").to_string().contains("end of a line"));
        assert!(parse_err("a = b = c\n").to_string().contains("one ="));
        assert!(parse_err("a = \"open\n").to_string().contains("closing"));
        assert!(parse_err("a = \"x\\q\"\n").to_string().contains("escape"));
        assert!(parse_err("a\n\tb\nc\n\t\t\td = 1\n")
            .to_string()
            .contains("more than one"));
        assert!(parse_err("a = 1\n\tb = 2\n").to_string().contains("parent"));
    }

    #[test]
    fn test_two_space_indent_unit() {
        // the first indented line fixes a two-space unit
        let root = parse("a\n  b\n    c = 1\n");
        let pairs = root.as_object().unwrap();
        let b = pairs[0].value.as_object().unwrap();
        let c = b[0].value.as_object().unwrap();
        assert_eq!(c[0].value.as_i32(), Some(1));

        // five spaces is not a multiple of two
        assert!(parse_err("a\n  b\n     c = 1\n")
            .to_string()
            .contains("indentation"));

        // a tab cannot appear once spaces are the unit
        assert!(parse_err("a\n  b\n\tc = 1\n")
            .to_string()
            .contains("space or tab"));
    }

    #[test]
    fn test_streaming_entries() {
        let mut parser = TmlParser::from_str("test.tml", "a = 1\n\tb = 2\n");
        let (first, depth) = parser.next_entry().unwrap().unwrap();
        assert_eq!(depth, 0);
        assert!(first.name.text_eq("a"));
        let (second, depth) = parser.next_entry().unwrap().unwrap();
        assert_eq!(depth, 1);
        assert!(second.name.text_eq("b"));
        assert!(parser.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_quoted_token_followed_by_text() {
        let root = parse("a = \"ab\"cd\n");
        let arr = root.as_object().unwrap()[0].value.as_array().unwrap();
        assert_eq!(arr[0].as_str(), Some("ab"));
        assert_eq!(arr[1].as_str(), Some("cd"));
    }
}
