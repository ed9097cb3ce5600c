//! Dynamic value tree for TML data.
//!
//! This module provides the [`Value`] type which represents any node of a
//! parsed TML document, together with [`Pair`], the name/value record that
//! makes up object bodies.
//!
//! ## Core Types
//!
//! - [`Value`]: provenance (file, line, column) plus a [`ValueKind`] payload
//! - [`ValueKind`]: the tag (none, null, bool, float, int, text, comment,
//!   array, object)
//! - [`Pair`]: two values (name and value) plus the stored indentation depth
//!
//! ## Usage Patterns
//!
//! ### Creating Values
//!
//! ```rust
//! use tml_cfg::Value;
//!
//! let null = Value::null();
//! let flag = Value::bool(true);
//! let number = Value::int(42);
//! let text = Value::text("hello");
//!
//! // Or with the tml! macro
//! use tml_cfg::tml;
//! let obj = tml!({
//!     "name" => "Alice",
//!     "age" => 30,
//! });
//! ```
//!
//! ### Type Checking and Extraction
//!
//! ```rust
//! use tml_cfg::Value;
//!
//! let value = Value::int(42);
//! assert!(value.is_int());
//! assert!(value.is_number());
//! assert_eq!(value.as_i32(), Some(42));
//! assert_eq!(value.as_str(), None);
//! ```
//!
//! ### Object Lookup
//!
//! ```rust
//! use tml_cfg::{Pair, Value};
//!
//! let obj = Value::object(vec![
//!     Pair::new(Value::text("width"), Value::int(800)),
//!     Pair::new(Value::text("title"), Value::text("demo")),
//! ]);
//! assert_eq!(obj.object_get_int("width"), Some(800));
//! assert_eq!(obj.object_get_text("title"), Some("demo"));
//! ```

use std::fmt;
use std::sync::Arc;

/// The payload of a [`Value`].
///
/// An object body is a `Vec<Pair>` rather than a map: entry order is
/// significant, names may repeat, and empty-line/comment records are entries
/// of their own.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ValueKind {
    /// Nothing: an empty line, or the absent half of a single-sided pair.
    #[default]
    None,
    Null,
    Bool(bool),
    Float(f32),
    Int {
        value: i32,
        /// Literal form of the source: 2, 8, 10 or 16; 1 when derived from
        /// a bool. Floats behave as base 10.
        base: u32,
    },
    Text {
        text: String,
        /// Whether the source wrote the text with enclosing double quotes.
        quoted: bool,
    },
    /// Comment text without the leading `#`.
    Comment(String),
    Array(Vec<Value>),
    Object(Vec<Pair>),
}

/// A single node of a TML document tree.
///
/// Every value carries provenance: a filename handle shared by all nodes of
/// one parse, and a 1-based line/column position (−1 when unknown).
///
/// # Examples
///
/// ```rust
/// use tml_cfg::{Value, ValueKind};
///
/// let v = Value::int(7);
/// assert_eq!(v.kind, ValueKind::Int { value: 7, base: 10 });
/// assert_eq!(v.line, -1);
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Value {
    /// One shared allocation per parsed file.
    pub filename: Option<Arc<str>>,
    /// 1-based line number, −1 when unknown.
    pub line: i32,
    /// 1-based column offset, −1 when unknown.
    pub column: i32,
    pub kind: ValueKind,
}

/// A name/value record inside an object body.
///
/// Shapes:
///
/// - *empty*: both sides are `None` (an empty line)
/// - *comment*: the name is a `Comment`, the value is `None`
/// - *single*: the value is `None`, the name carries the payload
/// - *object parent*: the value is an `Object`
/// - *assignment*: the value is a scalar or array
#[derive(Clone, Debug, PartialEq)]
pub struct Pair {
    pub name: Value,
    pub value: Value,
    /// Indentation depth at which the pair was parsed; −1 when undefined.
    pub depth: i32,
}

impl Value {
    /// Creates an empty (`None`) value.
    #[must_use]
    pub fn none() -> Self {
        Value::default()
    }

    /// Creates a `Null` value.
    #[must_use]
    pub fn null() -> Self {
        Value::from_kind(ValueKind::Null)
    }

    /// Creates a `Bool` value.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Value::from_kind(ValueKind::Bool(value))
    }

    /// Creates a `Float` value.
    #[must_use]
    pub fn float(value: f32) -> Self {
        Value::from_kind(ValueKind::Float(value))
    }

    /// Creates an `Int` value with parse base 10.
    #[must_use]
    pub fn int(value: i32) -> Self {
        Value::int_with_base(value, 10)
    }

    /// Creates an `Int` value recording the literal base it was parsed from.
    #[must_use]
    pub fn int_with_base(value: i32, base: u32) -> Self {
        Value::from_kind(ValueKind::Int { value, base })
    }

    /// Creates an unquoted `Text` value.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Value::from_kind(ValueKind::Text {
            text: text.into(),
            quoted: false,
        })
    }

    /// Creates a `Text` value that round-trips with enclosing quotes.
    #[must_use]
    pub fn quoted_text(text: impl Into<String>) -> Self {
        Value::from_kind(ValueKind::Text {
            text: text.into(),
            quoted: true,
        })
    }

    /// Creates a `Comment` value; `text` is stored without the leading `#`.
    #[must_use]
    pub fn comment(text: impl Into<String>) -> Self {
        Value::from_kind(ValueKind::Comment(text.into()))
    }

    /// Creates an `Array` value.
    #[must_use]
    pub fn array(values: Vec<Value>) -> Self {
        Value::from_kind(ValueKind::Array(values))
    }

    /// Creates an `Object` value.
    #[must_use]
    pub fn object(pairs: Vec<Pair>) -> Self {
        Value::from_kind(ValueKind::Object(pairs))
    }

    fn from_kind(kind: ValueKind) -> Self {
        Value {
            filename: None,
            line: -1,
            column: -1,
            kind,
        }
    }

    /// Attaches a source position, builder style.
    #[must_use]
    pub fn at(mut self, line: i32, column: i32) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Renders the position as `:<line>:<col>`, `:<line>`, `::<col>` or an
    /// empty string when nothing is known.
    #[must_use]
    pub fn position(&self) -> String {
        match (self.line >= 0, self.column >= 0) {
            (true, true) => format!(":{}:{}", self.line, self.column),
            (true, false) => format!(":{}", self.line),
            (false, true) => format!("::{}", self.column),
            (false, false) => String::new(),
        }
    }

    /// Filename plus [`Value::position`], for error messages.
    #[must_use]
    pub fn located(&self) -> String {
        match &self.filename {
            Some(name) => format!("{}{}", name, self.position()),
            None => self.position(),
        }
    }

    /// Returns `true` for the empty (`None`) record.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.kind, ValueKind::None)
    }

    /// Returns `true` if the value is a comment.
    #[inline]
    #[must_use]
    pub const fn is_comment(&self) -> bool {
        matches!(self.kind, ValueKind::Comment(_))
    }

    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.kind, ValueKind::Null)
    }

    /// Returns `true` if the value is a boolean.
    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self.kind, ValueKind::Bool(_))
    }

    /// Returns `true` if the value is a float.
    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self.kind, ValueKind::Float(_))
    }

    /// Returns `true` if the value is an integer.
    #[inline]
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self.kind, ValueKind::Int { .. })
    }

    /// Returns `true` if the value is an integer or a float.
    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        self.is_int() || self.is_float()
    }

    /// Returns `true` if the value is a text.
    #[inline]
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self.kind, ValueKind::Text { .. })
    }

    /// Returns `true` if the value is an array.
    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self.kind, ValueKind::Array(_))
    }

    /// Returns `true` if the value is an object.
    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self.kind, ValueKind::Object(_))
    }

    /// Returns `true` if the value is a scalar (none of comment, array,
    /// object).
    #[inline]
    #[must_use]
    pub const fn is_simple(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Null
                | ValueKind::Bool(_)
                | ValueKind::Float(_)
                | ValueKind::Int { .. }
                | ValueKind::Text { .. }
        )
    }

    /// Returns `true` if the value is a text equal to `text`.
    #[must_use]
    pub fn text_eq(&self, text: &str) -> bool {
        matches!(&self.kind, ValueKind::Text { text: t, .. } if t == text)
    }

    /// If the value is a boolean, returns it.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// If the value is a float, returns it.
    #[inline]
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self.kind {
            ValueKind::Float(f) => Some(f),
            _ => None,
        }
    }

    /// If the value is an integer, returns it.
    #[inline]
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self.kind {
            ValueKind::Int { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The parse base of an integer, 1 for bools, 10 for floats.
    #[inline]
    #[must_use]
    pub fn parse_base(&self) -> Option<u32> {
        match self.kind {
            ValueKind::Int { base, .. } => Some(base),
            ValueKind::Float(_) => Some(10),
            ValueKind::Bool(_) => Some(1),
            _ => None,
        }
    }

    /// If the value is a text, returns it.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// If the value is an array, returns its elements.
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::Array(values) => Some(values),
            _ => None,
        }
    }

    /// If the value is an object, returns its pairs.
    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&[Pair]> {
        match &self.kind {
            ValueKind::Object(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Boolean projection of a numeric or boolean value.
    ///
    /// Floats are nonzero from magnitude 0.5 upward; integers whenever they
    /// are not 0.
    #[must_use]
    pub fn as_bool_lossy(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Bool(b) => Some(b),
            ValueKind::Float(f) => Some(!(-0.5..0.5).contains(&f)),
            ValueKind::Int { value, .. } => Some(value != 0),
            _ => None,
        }
    }

    /// Float projection of a numeric or boolean value.
    #[must_use]
    pub fn as_f32_lossy(&self) -> Option<f32> {
        match self.kind {
            ValueKind::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            ValueKind::Float(f) => Some(f),
            ValueKind::Int { value, .. } => Some(value as f32),
            _ => None,
        }
    }

    /// Integer projection of a numeric or boolean value.
    ///
    /// Floats round half away from zero.
    #[must_use]
    pub fn as_i32_lossy(&self) -> Option<i32> {
        match self.kind {
            ValueKind::Bool(b) => Some(i32::from(b)),
            ValueKind::Float(f) => Some((f + if f >= 0.0 { 0.5 } else { -0.5 }) as i32),
            ValueKind::Int { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns `true` for an array with at least one array or object child.
    ///
    /// A complex array serializes one element per line; a simple array fits
    /// on a single line.
    #[must_use]
    pub fn is_complex_array(&self) -> bool {
        match &self.kind {
            ValueKind::Array(values) => values.iter().any(|v| v.is_array() || v.is_object()),
            _ => false,
        }
    }

    /// Finds the pair with the given name text, if exactly one exists.
    ///
    /// Returns `None` both when the attribute is missing and when it occurs
    /// more than once; use [`Value::object_get_pairs`] for duplicates.
    #[must_use]
    pub fn object_get_pair(&self, attr_name: &str) -> Option<&Pair> {
        let pairs = self.as_object()?;
        let mut found = None;
        for pair in pairs {
            if pair.name.text_eq(attr_name) {
                if found.is_some() {
                    return None;
                }
                found = Some(pair);
            }
        }
        found
    }

    /// The value of the uniquely named pair, see [`Value::object_get_pair`].
    #[must_use]
    pub fn object_get_value(&self, attr_name: &str) -> Option<&Value> {
        self.object_get_pair(attr_name).map(|pair| &pair.value)
    }

    /// Text shortcut over [`Value::object_get_value`].
    #[must_use]
    pub fn object_get_text(&self, attr_name: &str) -> Option<&str> {
        self.object_get_value(attr_name).and_then(Value::as_str)
    }

    /// Integer shortcut over [`Value::object_get_value`].
    #[must_use]
    pub fn object_get_int(&self, attr_name: &str) -> Option<i32> {
        self.object_get_value(attr_name).and_then(Value::as_i32)
    }

    /// Bool shortcut over [`Value::object_get_value`].
    #[must_use]
    pub fn object_get_bool(&self, attr_name: &str) -> Option<bool> {
        self.object_get_value(attr_name).and_then(Value::as_bool)
    }

    /// All pairs with the given name text, in document order.
    #[must_use]
    pub fn object_get_pairs(&self, attr_name: &str) -> Vec<&Pair> {
        match self.as_object() {
            Some(pairs) => pairs
                .iter()
                .filter(|pair| pair.name.text_eq(attr_name))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The values of all pairs with the given name text.
    #[must_use]
    pub fn object_get_values(&self, attr_name: &str) -> Vec<&Value> {
        self.object_get_pairs(attr_name)
            .into_iter()
            .map(|pair| &pair.value)
            .collect()
    }

    /// Index of the first pair with the given name text.
    #[must_use]
    pub fn object_attr_index(&self, attr_name: &str) -> Option<usize> {
        self.as_object()?
            .iter()
            .position(|pair| pair.name.text_eq(attr_name))
    }

    /// Structural equality ignoring provenance.
    ///
    /// Parse base and the quoted-text flag take part in the comparison;
    /// filename, line and column do not.
    #[must_use]
    pub fn content_eq(&self, other: &Value) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Array(a), ValueKind::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.content_eq(y))
            }
            (ValueKind::Object(a), ValueKind::Object(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.content_eq(y))
            }
            (a, b) => a == b,
        }
    }
}

impl Pair {
    /// Creates a pair with undefined depth.
    #[must_use]
    pub fn new(name: Value, value: Value) -> Self {
        Pair {
            name,
            value,
            depth: -1,
        }
    }

    /// Creates a single-sided pair (a standalone token line).
    #[must_use]
    pub fn from_name(name: Value) -> Self {
        Pair::new(name, Value::none())
    }

    /// Creates an empty-line record.
    #[must_use]
    pub fn empty() -> Self {
        Pair::new(Value::none(), Value::none())
    }

    /// Creates a comment record.
    #[must_use]
    pub fn comment(text: impl Into<String>) -> Self {
        Pair::new(Value::comment(text), Value::none())
    }

    /// Sets the stored depth, builder style.
    #[must_use]
    pub fn at_depth(mut self, depth: i32) -> Self {
        self.depth = depth;
        self
    }

    /// Returns `true` for an empty-line record.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_empty() && self.value.is_empty()
    }

    /// Returns `true` for a comment record.
    #[inline]
    #[must_use]
    pub const fn is_comment(&self) -> bool {
        self.name.is_comment() && self.value.is_empty()
    }

    /// Returns `true` for an empty-line or comment record.
    #[inline]
    #[must_use]
    pub const fn is_empty_or_comment(&self) -> bool {
        (self.name.is_empty() || self.name.is_comment()) && self.value.is_empty()
    }

    /// Returns `true` for an object parent (value side is an object).
    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        !self.name.is_object() && self.value.is_object()
    }

    /// Returns `true` for an unnamed pair holding an empty object.
    #[must_use]
    pub fn is_empty_object(&self) -> bool {
        self.name.is_empty()
            && matches!(&self.value.kind, ValueKind::Object(pairs) if pairs.is_empty())
    }

    /// Structural equality ignoring provenance, see [`Value::content_eq`].
    #[must_use]
    pub fn content_eq(&self, other: &Pair) -> bool {
        self.name.content_eq(&other.name) && self.value.content_eq(&other.value)
    }
}

impl Default for Pair {
    fn default() -> Self {
        Pair::empty()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match crate::writer::plain_value_to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<complex>"),
        }
    }
}

// TryFrom implementations for extracting primitives from a Value
impl TryFrom<Value> for i32 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value.kind {
            ValueKind::Int { value, .. } => Ok(value),
            _ => Err(crate::Error::custom(format!(
                "expected an integer, found {:?}",
                value.kind
            ))),
        }
    }
}

impl TryFrom<Value> for f32 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value.kind {
            ValueKind::Float(f) => Ok(f),
            ValueKind::Int { value, .. } => Ok(value as f32),
            _ => Err(crate::Error::custom(format!(
                "expected a number, found {:?}",
                value.kind
            ))),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value.kind {
            ValueKind::Bool(b) => Ok(b),
            _ => Err(crate::Error::custom(format!(
                "expected a bool, found {:?}",
                value.kind
            ))),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value.kind {
            ValueKind::Text { text, .. } => Ok(text),
            _ => Err(crate::Error::custom(format!(
                "expected a text, found {:?}",
                value.kind
            ))),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::bool(value)
    }
}

impl From<i8> for Value {
    fn from(value: i8) -> Self {
        Value::int(i32::from(value))
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::int(i32::from(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::int(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::int(i32::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::int(i32::from(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::float(value as f32)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::text(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::array(value)
    }
}

impl From<Vec<Pair>> for Value {
    fn from(value: Vec<Pair>) -> Self {
        Value::object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_projections() {
        let f = Value::float(0.6);
        assert_eq!(f.as_bool_lossy(), Some(true));
        assert_eq!(f.as_i32_lossy(), Some(1));

        let f = Value::float(0.4);
        assert_eq!(f.as_bool_lossy(), Some(false));
        assert_eq!(f.as_i32_lossy(), Some(0));

        let f = Value::float(-0.5);
        assert_eq!(f.as_bool_lossy(), Some(true));
        assert_eq!(f.as_i32_lossy(), Some(-1));

        let i = Value::int(0);
        assert_eq!(i.as_bool_lossy(), Some(false));
        assert_eq!(i.as_f32_lossy(), Some(0.0));

        let b = Value::bool(true);
        assert_eq!(b.as_i32_lossy(), Some(1));
        assert_eq!(b.as_f32_lossy(), Some(1.0));
        assert_eq!(b.parse_base(), Some(1));
    }

    #[test]
    fn test_position_rendering() {
        assert_eq!(Value::int(1).position(), "");
        assert_eq!(Value::int(1).at(3, 7).position(), ":3:7");
        assert_eq!(Value::int(1).at(3, -1).position(), ":3");
        assert_eq!(Value::int(1).at(-1, 7).position(), "::7");
    }

    #[test]
    fn test_pair_shapes() {
        assert!(Pair::empty().is_empty());
        assert!(Pair::comment(" note").is_comment());
        assert!(Pair::comment(" note").is_empty_or_comment());

        let parent = Pair::new(Value::text("obj"), Value::object(vec![]));
        assert!(parent.is_object());
        assert!(!parent.is_empty_object());

        let assignment = Pair::new(Value::text("a"), Value::int(1));
        assert!(!assignment.is_object());
        assert!(!assignment.is_empty_or_comment());
    }

    #[test]
    fn test_object_lookup() {
        let obj = Value::object(vec![
            Pair::new(Value::text("a"), Value::int(1)),
            Pair::comment(" in between"),
            Pair::new(Value::text("b"), Value::bool(true)),
            Pair::new(Value::text("a"), Value::int(2)),
        ]);
        // "a" occurs twice, so the unique lookup refuses it
        assert!(obj.object_get_pair("a").is_none());
        assert_eq!(obj.object_get_pairs("a").len(), 2);
        assert_eq!(obj.object_get_bool("b"), Some(true));
        assert_eq!(obj.object_attr_index("b"), Some(2));
        assert_eq!(obj.object_attr_index("c"), None);
    }

    #[test]
    fn test_complex_array() {
        let simple = Value::array(vec![Value::int(1), Value::text("x")]);
        assert!(!simple.is_complex_array());

        let complex = Value::array(vec![Value::int(1), Value::array(vec![])]);
        assert!(complex.is_complex_array());
    }

    #[test]
    fn test_tryfrom_extraction() {
        let n: i32 = Value::int(42).try_into().unwrap();
        assert_eq!(n, 42);
        assert!(i32::try_from(Value::text("x")).is_err());

        let f: f32 = Value::float(3.5).try_into().unwrap();
        assert_eq!(f, 3.5);
        let widened: f32 = Value::int(2).try_into().unwrap();
        assert_eq!(widened, 2.0);

        let b: bool = Value::bool(true).try_into().unwrap();
        assert!(b);
        assert!(bool::try_from(Value::int(1)).is_err());

        let s: String = Value::quoted_text("hi").try_into().unwrap();
        assert_eq!(s, "hi");
    }

    #[test]
    fn test_content_eq_ignores_provenance() {
        let a = Value::int(5).at(10, 2);
        let b = Value::int(5);
        assert_ne!(a, b);
        assert!(a.content_eq(&b));

        let c = Value::int_with_base(5, 16);
        assert!(!a.content_eq(&c));

        let q = Value::quoted_text("x");
        let raw = Value::text("x");
        assert!(!q.content_eq(&raw));
    }
}
