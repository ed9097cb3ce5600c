//! # tml-cfg
//!
//! Parser, serializer, binary codec and transform pipeline for the TML
//! configuration language.
//!
//! ## What is TML?
//!
//! TML is a small indentation-based markup language for configuration
//! data. A document is a tree of typed values (null, bool, float, int,
//! text, array, object) in which empty lines and comments are first-class
//! records, so a file can be loaded, transformed and written back without
//! losing its shape:
//!
//! ```text
//! # window setup
//! window
//!     width = 800
//!     height = 600
//! tags = fast small
//! ```
//!
//! BTML is the compact self-describing binary encoding of the same data
//! model, with an optional header and a deduplicating string table.
//!
//! ## Key Features
//!
//! - **Faithful round-trips**: comments, empty lines and source positions
//!   survive parsing; quoting is normalized on output
//! - **Binary encoding**: [`btml`] converts trees to stable
//!   little-endian bytes and back
//! - **Transform pipeline**: [`include`] resolution, parametric
//!   [`template`] expansion, [`translation`]/profile/variable
//!   substitution and an embedded [`expr`] interpreter, each independently
//!   invocable
//! - **JSON interop**: [`json`] maps JSON documents onto the same tree
//!
//! ## Quick Start
//!
//! ```rust
//! use tml_cfg::{parse_str, to_string};
//!
//! let root = parse_str("app.tml", "window\n\twidth = 800\n\theight = 600\n").unwrap();
//! let window = root.object_get_value("window").unwrap();
//! assert_eq!(window.object_get_int("width"), Some(800));
//!
//! // and back to text
//! assert_eq!(to_string(&root).unwrap(), "window\n\twidth = 800\n\theight = 600\n");
//! ```
//!
//! ### Binary round-trip
//!
//! ```rust
//! use tml_cfg::{btml, parse_str};
//!
//! let root = parse_str("app.tml", "a = 1\nb = two\n").unwrap();
//! let bytes = btml::encode_with_header(&root, true).unwrap();
//! let decoded = btml::decode_auto(&bytes).unwrap();
//! assert!(decoded.value.content_eq(&root));
//! ```
//!
//! ### Building values
//!
//! ```rust
//! use tml_cfg::{tml, to_string};
//!
//! let value = tml!({
//!     "name" => "demo",
//!     "sizes" => [1, 2, 3],
//! });
//! assert_eq!(to_string(&value).unwrap(), "name = demo\nsizes = 1 2 3\n");
//! ```
//!
//! ## Pipeline order
//!
//! When all transform passes run over one document they apply as
//! includes → templates → translations → profiles → variables →
//! expressions; each pass consumes and produces the same [`Value`] tree.

pub mod btml;
pub mod dump;
pub mod error;
pub mod expr;
pub mod include;
pub mod json;
pub mod macros;
pub mod options;
pub mod parser;
pub mod template;
pub mod translation;
pub mod value;
pub mod writer;

pub use error::{Error, Result};
pub use options::{BtmlOptions, EmitOptions, ParseOptions};
pub use parser::TmlParser;
pub use value::{Pair, Value, ValueKind};
pub use writer::TmlLine;

use std::io;
use std::path::Path;

/// Parses TML text into its root object, keeping empty lines and comments.
///
/// `name` is used for provenance and error messages.
///
/// # Examples
///
/// ```rust
/// use tml_cfg::parse_str;
///
/// let root = parse_str("demo.tml", "a = 1\n").unwrap();
/// assert_eq!(root.object_get_int("a"), Some(1));
/// ```
///
/// # Errors
///
/// Returns a syntax error with `file:line` context for invalid input.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_str(name: &str, source: &str) -> Result<Value> {
    parse_str_with_options(name, source, &ParseOptions::default())
}

/// Parses TML text with explicit [`ParseOptions`].
///
/// # Errors
///
/// Same as [`parse_str`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_str_with_options(name: &str, source: &str, options: &ParseOptions) -> Result<Value> {
    TmlParser::from_str(name, source).parse_tree(options)
}

/// Reads and parses a TML file.
///
/// # Errors
///
/// Returns I/O errors and the errors of [`parse_str`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_file(path: impl AsRef<Path>) -> Result<Value> {
    parse_file_with_options(path, &ParseOptions::default())
}

/// Reads and parses a TML file with explicit [`ParseOptions`].
///
/// # Errors
///
/// Same as [`parse_file`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_file_with_options(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Value> {
    TmlParser::from_file(path)?.parse_tree(options)
}

/// Serializes a value as TML text.
///
/// # Examples
///
/// ```rust
/// use tml_cfg::{tml, to_string};
///
/// let value = tml!({ "a" => 1 });
/// assert_eq!(to_string(&value).unwrap(), "a = 1\n");
/// ```
///
/// # Errors
///
/// Returns an error for trees the TML syntax cannot express.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string(value: &Value) -> Result<String> {
    writer::value_to_string(0, value, &EmitOptions::default())
}

/// Serializes a value as TML text with explicit [`EmitOptions`].
///
/// # Errors
///
/// Same as [`to_string`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options(value: &Value, options: &EmitOptions) -> Result<String> {
    writer::value_to_string(0, value, options)
}

/// Serializes a value as TML text into a writer.
///
/// # Errors
///
/// Returns serialization errors and write failures.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W: io::Write>(writer: W, value: &Value) -> Result<()> {
    writer::value_to_writer(writer, 0, value, &EmitOptions::default())
}

/// Encodes a value as BTML bytes with the default options (header, no
/// string table).
///
/// # Errors
///
/// Returns encoding errors, see [`btml::encode_with_options`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_btml(value: &Value) -> Result<Vec<u8>> {
    btml::encode_with_options(value, &BtmlOptions::default())
}

/// Encodes a value as BTML bytes with explicit [`BtmlOptions`].
///
/// # Errors
///
/// Same as [`to_btml`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_btml_with_options(value: &Value, options: &BtmlOptions) -> Result<Vec<u8>> {
    btml::encode_with_options(value, options)
}

/// Decodes BTML bytes, probing for the optional header.
///
/// # Errors
///
/// Returns a format error for malformed bytes.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_btml(bytes: &[u8]) -> Result<Value> {
    Ok(btml::decode_auto(bytes)?.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let source = "obj\n\ta = 1\n\tb = 2\narr = 1 3 5\n";
        let root = parse_str("demo.tml", source).unwrap();
        assert_eq!(to_string(&root).unwrap(), source);
    }

    #[test]
    fn test_btml_round_trip() {
        let source = "obj\n\ta = 1\n\tb = 2\n# note\n";
        let root = parse_str("demo.tml", source).unwrap();
        let bytes = to_btml(&root).unwrap();
        let back = from_btml(&bytes).unwrap();
        assert!(back.content_eq(&root));
    }

    #[test]
    fn test_values_only_parse() {
        let root =
            parse_str_with_options("demo.tml", "# c\na = 1\n\n", &ParseOptions::values_only())
                .unwrap();
        assert_eq!(root.as_object().unwrap().len(), 1);
    }
}
