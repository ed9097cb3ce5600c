//! Include resolution.
//!
//! An object entry of the form `include <relative-path>` (a two-element
//! array on the name side) is expanded in place with the tree of the
//! referenced document, after that document's own includes have been
//! resolved.
//!
//! File access goes through the [`FileLoader`] seam; [`TmlFileLoader`] is
//! the filesystem implementation with a path stack, so relative paths are
//! resolved against the including file. A cycle is caught by the nesting
//! ceiling of 50.
//!
//! ## Usage
//!
//! ```no_run
//! use tml_cfg::include::{load_and_include, IncludeOptions, TmlFileLoader};
//!
//! let mut loader = TmlFileLoader::new();
//! let (root, included) =
//!     load_and_include("conf/main.tml", &mut loader, &IncludeOptions::new()).unwrap();
//! assert!(included.len() >= 1);
//! # let _ = root;
//! ```

use crate::{Error, Pair, ParseOptions, Result, TmlParser, Value, ValueKind};
use indexmap::IndexMap;
use std::collections::BTreeMap;

const MAX_RECURSIVE_DEPTH: usize = 50;

/// Absolute filename → number of times it was loaded in one run.
pub type IncludeFileMap = IndexMap<String, u32>;

/// Provides documents to the include resolver.
pub trait FileLoader {
    /// Resolves an include path against the current file.
    fn full_filename(&self, include_filename: &str) -> String;

    /// Loads and parses a document and pushes its directory onto the path
    /// stack. Returns the tree and the resolved full filename.
    ///
    /// # Errors
    ///
    /// Returns I/O and parse errors; the path stack is unchanged on error.
    fn load_and_push(
        &mut self,
        include_filename: &str,
        options: &ParseOptions,
    ) -> Result<(Value, String)>;

    /// Pops the path stack; `false` when it is already empty.
    fn pop(&mut self) -> bool;

    /// Current nesting depth of pushed files.
    fn nested_depth(&self) -> usize;
}

/// Options for the include resolver.
#[derive(Clone, Debug)]
pub struct IncludeOptions {
    /// First token of an include site, normally `include`.
    pub keyword: String,
    /// Expand a file only on its first inclusion; later sites collapse to a
    /// placeholder record.
    pub include_once: bool,
    /// Cache parsed trees per absolute filename and reuse a copy.
    pub file_buffering: bool,
    pub parse: ParseOptions,
}

impl Default for IncludeOptions {
    fn default() -> Self {
        IncludeOptions {
            keyword: "include".to_string(),
            include_once: false,
            file_buffering: false,
            parse: ParseOptions::default(),
        }
    }
}

impl IncludeOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the include keyword.
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    /// Enables include-once behavior.
    #[must_use]
    pub fn with_include_once(mut self, once: bool) -> Self {
        self.include_once = once;
        self
    }

    /// Enables the per-run file buffer.
    #[must_use]
    pub fn with_file_buffering(mut self, buffering: bool) -> Self {
        self.file_buffering = buffering;
        self
    }

    /// Sets the parse options used for loaded files.
    #[must_use]
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }
}

/// Removes duplicate separators and trailing separators.
///
/// A single leading separator survives (`"///"` becomes `"/"`).
fn reduce_slashes_one(name: &str, slash: char) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending = false;
    let mut all_slashes = true;
    for ch in name.chars() {
        if ch == slash {
            pending = true;
        } else {
            if pending {
                out.push(slash);
            }
            out.push(ch);
            pending = false;
            all_slashes = false;
        }
    }
    if all_slashes {
        return name.chars().take(1).collect();
    }
    out
}

fn reduce_slashes(name: &str) -> String {
    reduce_slashes_one(&reduce_slashes_one(name, '/'), '\\')
}

/// The directory part including the trailing separator, or an empty string.
fn dirname(filename: &str) -> String {
    match filename.rfind(['/', '\\']) {
        Some(idx) => filename[..=idx].to_string(),
        None => String::new(),
    }
}

/// Filesystem-backed loader over [`TmlParser`] with a path stack.
#[derive(Debug, Default)]
pub struct TmlFileLoader {
    path_stack: Vec<String>,
}

impl TmlFileLoader {
    /// Creates a loader with an empty path stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the path stack.
    pub fn reset(&mut self) {
        self.path_stack.clear();
    }

    fn current_dir(&self) -> String {
        self.path_stack.last().cloned().unwrap_or_default()
    }
}

impl FileLoader for TmlFileLoader {
    fn full_filename(&self, include_filename: &str) -> String {
        let mut inc = reduce_slashes(include_filename);
        let mut cur = self.current_dir();
        loop {
            let mut modified = false;
            if (inc.starts_with("../") || inc.starts_with("..\\")) && cur.len() >= 2 {
                cur = dirname(&cur[..cur.len() - 1]);
                inc = inc[3..].to_string();
                modified = true;
            }
            if inc.starts_with("./") || inc.starts_with(".\\") {
                inc = inc[2..].to_string();
                modified = true;
            }
            if !modified {
                break;
            }
        }
        cur + &inc
    }

    fn load_and_push(
        &mut self,
        include_filename: &str,
        options: &ParseOptions,
    ) -> Result<(Value, String)> {
        if include_filename.is_empty() {
            return Err(Error::io("an empty filename is not allowed"));
        }
        if include_filename.ends_with('/') || include_filename.ends_with('\\') {
            return Err(Error::io(format!(
                "filename {} with a trailing separator is not allowed",
                include_filename
            )));
        }
        let full = self.full_filename(include_filename);
        let mut parser = TmlParser::from_file(&full)?;
        let value = parser.parse_tree(options)?;
        self.path_stack.push(dirname(&full));
        Ok((value, full))
    }

    fn pop(&mut self) -> bool {
        self.path_stack.pop().is_some()
    }

    fn nested_depth(&self) -> usize {
        self.path_stack.len()
    }
}

/// Shifts the stored depths of an included subtree.
///
/// Empty lines at depth 0 keep their depth; pairs without a stored depth
/// are untouched.
fn shift_depths_pair(pair: &mut Pair, diff: i32) {
    if pair.depth >= 0 && !(pair.is_empty() && pair.depth == 0) {
        pair.depth += diff;
    }
    if let ValueKind::Object(children) = &mut pair.name.kind {
        for child in children {
            shift_depths_pair(child, diff);
        }
    }
    if let ValueKind::Object(children) = &mut pair.value.kind {
        for child in children {
            shift_depths_pair(child, diff);
        }
    }
}

fn shift_depths(value: &mut Value, diff: i32) {
    if diff <= 0 {
        return;
    }
    if let ValueKind::Object(pairs) = &mut value.kind {
        for pair in pairs {
            shift_depths_pair(pair, diff);
        }
    }
}

fn is_include_site(pair: &Pair, keyword: &str) -> bool {
    match pair.name.as_array() {
        Some(elements) => elements.len() >= 2 && elements[0].text_eq(keyword),
        None => false,
    }
}

/// The placeholder for a file skipped by include-once.
fn already_included_placeholder(include_filename: &str, options: &IncludeOptions) -> Value {
    let mut pairs = Vec::new();
    if options.parse.keep_comments {
        pairs.push(Pair::comment(format!(
            " {} is already included",
            include_filename
        )));
    } else if options.parse.keep_empty_lines {
        pairs.push(Pair::empty());
    }
    Value::object(pairs)
}

fn resolve(
    value: &mut Value,
    loader: &mut dyn FileLoader,
    options: &IncludeOptions,
    included: &mut IncludeFileMap,
    buffers: &mut Option<BTreeMap<String, Value>>,
    current_depth: i32,
) -> Result<()> {
    let at = value.located();
    let ValueKind::Object(pairs) = &mut value.kind else {
        return Err(Error::structure(at, "is no object"));
    };

    let mut i = 0usize;
    while i < pairs.len() {
        if pairs[i].value.is_object() {
            resolve(
                &mut pairs[i].value,
                loader,
                options,
                included,
                buffers,
                current_depth + 1,
            )?;
        }
        if !is_include_site(&pairs[i], &options.keyword) {
            i += 1;
            continue;
        }

        let site = pairs[i].name.located();
        let include_filename = pairs[i].name.as_array().and_then(|a| a[1].as_str())
            .unwrap_or_default()
            .to_string();
        let full = loader.full_filename(&include_filename);

        let mut include_value;
        if !options.include_once || included.get(&full).copied().unwrap_or(0) == 0 {
            let buffered = buffers.as_ref().and_then(|b| b.get(&full)).cloned();
            if let Some(tree) = buffered {
                include_value = tree;
            } else {
                let orig_depth = loader.nested_depth();
                let (tree, loaded_full) = loader
                    .load_and_push(&include_filename, &options.parse)
                    .map_err(|e| Error::custom(format!("{}: {}", site, e)))?;
                include_value = tree;
                if loaded_full != full {
                    loader.pop();
                    return Err(Error::custom(format!(
                        "{}: file loader has an invalid state (wrong full filename: {} != {})",
                        site, loaded_full, full
                    )));
                }
                *included.entry(full.clone()).or_insert(0) += 1;
                if loader.nested_depth() != orig_depth + 1 {
                    loader.pop();
                    return Err(Error::custom(format!(
                        "{}: file loader has an invalid state (wrong nesting depth)",
                        site
                    )));
                }
                if loader.nested_depth() > MAX_RECURSIVE_DEPTH {
                    loader.pop();
                    return Err(Error::limit(format!(
                        "reached the maximum depth for includes, maybe a recursive loop (depth {})",
                        loader.nested_depth() + 1
                    )));
                }
                // the loaded tree resolves its own includes at the same
                // nesting depth, not one deeper
                if let Err(e) = resolve(
                    &mut include_value,
                    loader,
                    options,
                    included,
                    buffers,
                    current_depth,
                ) {
                    loader.pop();
                    return Err(Error::custom(format!("{}: {}", site, e)));
                }
                if !loader.pop() {
                    return Err(Error::custom(format!(
                        "{}: pop failed for the file loader",
                        site
                    )));
                }
                if loader.nested_depth() != orig_depth {
                    return Err(Error::custom(format!(
                        "{}: file loader has an invalid state (wrong nesting depth)",
                        site
                    )));
                }
                if let Some(buffers) = buffers {
                    buffers.insert(full.clone(), include_value.clone());
                }
            }
            // depth shifting must come after buffering, different sites can
            // sit at different indentations
            let diff = if pairs[i].depth >= 0 {
                pairs[i].depth
            } else {
                current_depth
            };
            shift_depths(&mut include_value, diff);
        } else {
            include_value = already_included_placeholder(&include_filename, options);
            let diff = if pairs[i].depth >= 0 {
                pairs[i].depth
            } else {
                current_depth
            };
            shift_depths(&mut include_value, diff);
        }

        let ValueKind::Object(mut inc_pairs) = include_value.kind else {
            return Err(Error::structure(
                site,
                format!("{} is not loaded as an object", include_filename),
            ));
        };

        // an include site may declare child entries; they graft onto the
        // last pair of the inclusion, whose value must still be empty
        if pairs[i].value.is_object() {
            let Some(last) = inc_pairs.last_mut() else {
                return Err(Error::structure(
                    site,
                    format!("{} is an empty object, can't add a child object", include_filename),
                ));
            };
            if !last.value.is_empty() {
                return Err(Error::structure(
                    site,
                    format!(
                        "the last name-value pair of {} has no empty value, can't add a child object",
                        include_filename
                    ),
                ));
            }
            last.value = std::mem::take(&mut pairs[i].value);
        }

        match inc_pairs.len() {
            0 => {
                pairs.remove(i);
            }
            1 => {
                pairs[i] = inc_pairs.pop().unwrap_or_default();
                i += 1;
            }
            n => {
                pairs.splice(i..=i, inc_pairs);
                i += n;
            }
        }
    }
    Ok(())
}

/// Expands all include sites of a tree in place.
///
/// `included` collects how often each absolute filename was loaded; pass an
/// empty map for a fresh run.
///
/// # Errors
///
/// Returns loader, structure and limit errors; the tree may be partially
/// rewritten and should be discarded on error.
pub fn include_files(
    value: &mut Value,
    loader: &mut dyn FileLoader,
    options: &IncludeOptions,
    included: &mut IncludeFileMap,
) -> Result<()> {
    let mut buffers = options.file_buffering.then(BTreeMap::new);
    resolve(value, loader, options, included, &mut buffers, 0)
}

/// Loads a document and expands all of its includes.
///
/// # Errors
///
/// Returns loader, parse, structure and limit errors.
pub fn load_and_include(
    filename: &str,
    loader: &mut dyn FileLoader,
    options: &IncludeOptions,
) -> Result<(Value, IncludeFileMap)> {
    let orig_depth = loader.nested_depth();
    let (mut value, _full) = loader
        .load_and_push(filename, &options.parse)
        .map_err(|e| Error::custom(format!("{}: load {} failed", e, filename)))?;
    if loader.nested_depth() != orig_depth + 1 {
        loader.pop();
        return Err(Error::custom("file loader has an invalid state"));
    }
    let mut included = IncludeFileMap::new();
    let result = include_files(&mut value, loader, options, &mut included);
    if !loader.pop() || loader.nested_depth() != orig_depth {
        return Err(Error::custom("file loader has an invalid state"));
    }
    result?;
    Ok((value, included))
}
