//! Configuration options for parsing, serializing and binary encoding.
//!
//! - [`ParseOptions`]: whether empty lines and comments survive a parse
//! - [`EmitOptions`]: how the serializer chooses indentation depths
//! - [`BtmlOptions`]: header and string-table flags for the binary codec
//!
//! ## Examples
//!
//! ```rust
//! use tml_cfg::{parse_str_with_options, ParseOptions};
//!
//! let source = "# a comment\na = 1\n";
//! let full = parse_str_with_options("cfg.tml", source, &ParseOptions::new()).unwrap();
//! assert_eq!(full.as_object().unwrap().len(), 2);
//!
//! let stripped =
//!     parse_str_with_options("cfg.tml", source, &ParseOptions::values_only()).unwrap();
//! assert_eq!(stripped.as_object().unwrap().len(), 1);
//! ```

/// Controls which records the TML parser keeps.
///
/// By default both empty lines and comments are preserved so a document
/// round-trips faithfully; [`ParseOptions::values_only`] drops both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    pub keep_empty_lines: bool,
    pub keep_comments: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            keep_empty_lines: true,
            keep_comments: true,
        }
    }
}

impl ParseOptions {
    /// Creates the default options (everything preserved).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options that drop empty lines and comments.
    #[must_use]
    pub fn values_only() -> Self {
        ParseOptions {
            keep_empty_lines: false,
            keep_comments: false,
        }
    }

    /// Sets whether empty lines become records.
    #[must_use]
    pub fn with_empty_lines(mut self, keep: bool) -> Self {
        self.keep_empty_lines = keep;
        self
    }

    /// Sets whether comments become records.
    #[must_use]
    pub fn with_comments(mut self, keep: bool) -> Self {
        self.keep_comments = keep;
        self
    }
}

/// Controls how the TML serializer computes indentation.
///
/// With the default, depth is recomputed from tree nesting. With
/// [`EmitOptions::with_stored_depth`] each pair is emitted at its stored
/// depth, which reproduces documents whose indentation was retained by the
/// include resolver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitOptions {
    pub use_stored_depth: bool,
}

impl EmitOptions {
    /// Creates the default options (depth from nesting).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects stored-depth emission.
    #[must_use]
    pub fn with_stored_depth(mut self, use_stored: bool) -> Self {
        self.use_stored_depth = use_stored;
        self
    }
}

/// Controls the BTML encoder.
///
/// The header carries magic, version and the string-table flag; embedded
/// uses may omit it. The string table deduplicates strings that occur at
/// least twice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BtmlOptions {
    pub header: bool,
    pub string_table: bool,
}

impl Default for BtmlOptions {
    fn default() -> Self {
        BtmlOptions {
            header: true,
            string_table: false,
        }
    }
}

impl BtmlOptions {
    /// Creates the default options (header, no string table).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the 6-byte header is written.
    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Enables the deduplicating string table (implies a header).
    #[must_use]
    pub fn with_string_table(mut self, table: bool) -> Self {
        self.string_table = table;
        self
    }
}
