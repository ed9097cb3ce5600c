//! Error types for TML parsing, encoding and the transform passes.
//!
//! All fallible operations in this crate return [`Result`] with a single
//! [`Error`] enum. Errors carry the source position (`file:line:column`)
//! whenever the failing construct has one.
//!
//! ## Error Categories
//!
//! - **Syntax**: invalid TML input (bad indentation, unterminated quote,
//!   misplaced `=`, illegal depth jump)
//! - **Structure**: a tree that cannot be transformed the requested way
//!   (parent with a non-empty value, duplicate template id, bad graft)
//! - **Reference**: unknown template or translation id, wrong argument count
//! - **Limit**: a recursion ceiling was hit (includes, templates)
//! - **Format**: malformed BTML bytes (wrong magic, missing terminator, …)
//! - **Eval**: an expression could not be evaluated
//!
//! ## Examples
//!
//! ```rust
//! use tml_cfg::parse_str;
//!
//! let result = parse_str("bad.tml", "a = = b");
//! assert!(result.is_err());
//! if let Err(err) = result {
//!     // Messages carry file and line: "bad.tml:1: ..."
//!     assert!(err.to_string().contains("bad.tml:1"));
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// All errors produced by the parser, the codecs and the transform passes.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// TML syntax error with source position
    #[error("{file}:{line}: {msg}")]
    Syntax {
        file: String,
        line: u32,
        msg: String,
    },

    /// The tree has a shape the requested operation cannot work with
    #[error("{at}: {msg}")]
    Structure { at: String, msg: String },

    /// Unknown id or wrong argument count
    #[error("{at}: {msg}")]
    Reference { at: String, msg: String },

    /// A recursion ceiling was exceeded
    #[error("{0}")]
    Limit(String),

    /// Malformed BTML bytes
    #[error("btml: {0}")]
    Format(String),

    /// Expression evaluation failure
    #[error("eval: {0}")]
    Eval(String),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Creates a syntax error with file and line information.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tml_cfg::Error;
    ///
    /// let err = Error::syntax("cfg.tml", 10, "unterminated quoted text");
    /// assert!(err.to_string().starts_with("cfg.tml:10"));
    /// ```
    pub fn syntax(file: &str, line: u32, msg: impl Into<String>) -> Self {
        Error::Syntax {
            file: file.to_string(),
            line,
            msg: msg.into(),
        }
    }

    /// Creates a structure error anchored at a source position.
    ///
    /// `at` is usually [`Value::located`](crate::Value::located) of the
    /// offending node.
    pub fn structure(at: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Structure {
            at: at.into(),
            msg: msg.into(),
        }
    }

    /// Creates a reference error (unknown id, wrong argument count).
    pub fn reference(at: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Reference {
            at: at.into(),
            msg: msg.into(),
        }
    }

    /// Creates a recursion-limit error.
    pub fn limit(msg: impl Into<String>) -> Self {
        Error::Limit(msg.into())
    }

    /// Creates a BTML format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Creates an expression evaluation error.
    pub fn eval(msg: impl Into<String>) -> Self {
        Error::Eval(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl fmt::Display) -> Self {
        Error::Io(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<fmt::Error> for Error {
    fn from(err: fmt::Error) -> Self {
        Error::Custom(err.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
