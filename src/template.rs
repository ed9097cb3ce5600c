//! Parametric templates.
//!
//! A template is declared as a `template` object entry carrying `name`,
//! `parameters` and a body of pairs:
//!
//! ```text
//! template
//!     name = pair
//!     parameters = k v
//!     $k = $v
//! ```
//!
//! A use site is an array whose first element is the `use-template` keyword,
//! followed by the template name and one argument per parameter:
//!
//! ```text
//! use-template pair foo 42
//! ```
//!
//! A use site at name position with an empty value expands to the full body
//! (0, 1 or N pairs, spliced in place). A use site inside a value, or at a
//! name that carries a value, must expand to a single token ("simple
//! replacement"). Expansion is recursive up to a depth of 50 and detects
//! cyclic templates.
//!
//! ## Usage
//!
//! ```rust
//! use tml_cfg::template::{add_templates, use_templates, TemplateMap};
//! use tml_cfg::parse_str;
//!
//! let source = "template\n\tname = pair\n\tparameters = k v\n\t$k = $v\nuse-template pair foo 42\n";
//! let mut root = parse_str("t.tml", source).unwrap();
//! let mut templates = TemplateMap::new();
//! add_templates(&mut templates, &mut root, true, "template").unwrap();
//! use_templates(&templates, &mut root, "use-template").unwrap();
//! assert_eq!(root.object_get_int("foo"), Some(42));
//! ```

use crate::{writer, EmitOptions, Error, Pair, ParseOptions, Result, TmlParser, Value, ValueKind};
use indexmap::IndexMap;
use std::fmt;
use std::path::Path;

const MAX_RECURSIVE_DEPTH: usize = 50;

/// A collected template: name, parameter names and body pairs.
#[derive(Clone, Debug)]
pub struct Template {
    name: String,
    parameters: Vec<String>,
    body: Vec<Pair>,
}

/// Template name → template, in declaration order.
pub type TemplateMap = IndexMap<String, Template>;

type ParamMap = IndexMap<String, Value>;

impl Template {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    #[must_use]
    pub fn body(&self) -> &[Pair] {
        &self.body
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        write!(f, "parameters: {}", self.parameters.len())?;
        if !self.parameters.is_empty() {
            write!(f, ":")?;
            for parameter in &self.parameters {
                write!(f, " {}", parameter)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "tml:")?;
        for pair in &self.body {
            let text = writer::pair_to_string(1, pair, &EmitOptions::new())
                .unwrap_or_else(|e| format!("<{}>\n", e));
            write!(f, "{}", text)?;
        }
        Ok(())
    }
}

/// Collects template declarations from the top-level object of a tree.
///
/// With `remove`, the declarations are taken out of the tree.
///
/// # Errors
///
/// Returns structure errors for malformed declarations and reference errors
/// for duplicate template names.
pub fn add_templates(
    templates: &mut TemplateMap,
    value: &mut Value,
    remove: bool,
    keyword: &str,
) -> Result<()> {
    let at = value.located();
    let ValueKind::Object(pairs) = &mut value.kind else {
        return Err(Error::structure(at, "is no object"));
    };

    let mut i = 0usize;
    while i < pairs.len() {
        if !pairs[i].name.text_eq(keyword) {
            i += 1;
            continue;
        }
        let template = collect_template(&pairs[i], templates)?;
        templates.insert(template.name.clone(), template);
        if remove {
            pairs.remove(i);
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Parses a file and collects its templates.
///
/// # Errors
///
/// Returns parse errors and the errors of [`add_templates`].
pub fn add_templates_from_file(
    templates: &mut TemplateMap,
    path: impl AsRef<Path>,
    options: &ParseOptions,
    keyword: &str,
) -> Result<()> {
    let mut root = TmlParser::from_file(path)?.parse_tree(options)?;
    add_templates(templates, &mut root, false, keyword)
}

fn collect_template(pair: &Pair, templates: &TemplateMap) -> Result<Template> {
    let ValueKind::Object(body) = &pair.value.kind else {
        return Err(Error::structure(pair.value.located(), "is no object"));
    };

    let Some(name_index) = body.iter().position(|p| !p.is_empty_or_comment()) else {
        return Err(Error::structure(
            pair.value.located(),
            "two or more pairs are necessary",
        ));
    };
    let Some(params_index) = body
        .iter()
        .skip(name_index + 1)
        .position(|p| !p.is_empty_or_comment())
        .map(|offset| name_index + 1 + offset)
    else {
        return Err(Error::structure(
            pair.value.located(),
            "two or more pairs are necessary",
        ));
    };

    let name_pair = &body[name_index];
    if !name_pair.name.text_eq("name") {
        return Err(Error::structure(
            name_pair.name.located(),
            "must be 'name'",
        ));
    }
    let name = name_pair.value.as_str().unwrap_or_default().to_string();
    if name.is_empty() {
        return Err(Error::structure(
            name_pair.value.located(),
            "no valid name",
        ));
    }
    if templates.contains_key(&name) {
        return Err(Error::reference(
            name_pair.value.located(),
            format!("name '{}' is already used", name),
        ));
    }

    let params_pair = &body[params_index];
    if !params_pair.name.text_eq("parameters") {
        return Err(Error::structure(
            params_pair.name.located(),
            "must be 'parameters'",
        ));
    }
    let parameters = match &params_pair.value.kind {
        ValueKind::Text { text, .. } => {
            if text == "none" {
                Vec::new()
            } else {
                vec![text.clone()]
            }
        }
        ValueKind::Array(elements) => {
            let mut parameters = Vec::with_capacity(elements.len());
            for element in elements {
                match element.as_str() {
                    Some(text) if !text.is_empty() => parameters.push(text.to_string()),
                    _ => {
                        return Err(Error::structure(
                            element.located(),
                            "a parameter must be a text",
                        ));
                    }
                }
            }
            parameters
        }
        _ => {
            return Err(Error::structure(
                params_pair.value.located(),
                "parameters must be a text or an array of texts",
            ));
        }
    };

    Ok(Template {
        name,
        parameters,
        body: body[params_index + 1..].to_vec(),
    })
}

fn is_use_site(value: &Value, keyword: &str) -> bool {
    match value.as_array() {
        Some(elements) => !elements.is_empty() && elements[0].text_eq(keyword),
        None => false,
    }
}

/// Resolves the template for a use site and binds its arguments.
fn get_template<'a>(
    templates: &'a TemplateMap,
    value: &Value,
) -> Result<(&'a Template, ParamMap)> {
    let Some(elements) = value.as_array() else {
        return Err(Error::structure(value.located(), "is not an array"));
    };
    if elements.len() < 2 {
        return Err(Error::structure(
            value.located(),
            "an empty array is not allowed",
        ));
    }
    let name = elements[1].as_str().unwrap_or_default();
    let Some(template) = templates.get(name) else {
        return Err(Error::reference(
            elements[1].located(),
            format!("template '{}' not found", name),
        ));
    };
    if template.parameters.len() + 2 != elements.len() {
        return Err(Error::reference(
            elements[1].located(),
            format!("wrong parameter count for template '{}'", name),
        ));
    }
    let mut params = ParamMap::new();
    for (parameter, argument) in template.parameters.iter().zip(&elements[2..]) {
        if params.insert(parameter.clone(), argument.clone()).is_some() {
            return Err(Error::structure(
                argument.located(),
                "creating the parameter map failed",
            ));
        }
    }
    Ok((template, params))
}

/// Replaces every text equal to a parameter name with its argument.
fn replace_params_value(params: &ParamMap, value: &mut Value) {
    match &mut value.kind {
        ValueKind::Text { text, .. } => {
            if let Some(argument) = params.get(text.as_str()) {
                *value = argument.clone();
            }
        }
        ValueKind::Array(elements) => {
            for element in elements {
                replace_params_value(params, element);
            }
        }
        ValueKind::Object(pairs) => {
            for pair in pairs {
                replace_params_value(params, &mut pair.name);
                replace_params_value(params, &mut pair.value);
            }
        }
        _ => {}
    }
}

fn replace_params(params: &ParamMap, pair: &mut Pair) {
    replace_params_value(params, &mut pair.name);
    replace_params_value(params, &mut pair.value);
}

/// Adjusts stored depths of an expanded body pair.
///
/// With a defined template depth the shift is relative; otherwise the site
/// depth is applied absolutely. Children always move one step deeper.
fn renumber_depth(pair: &mut Pair, abs_depth: i32, rel_diff: i32, use_relative: bool) {
    if pair.depth >= 0 {
        if use_relative {
            pair.depth += rel_diff;
        } else {
            pair.depth = abs_depth;
        }
    }
    if let ValueKind::Object(children) = &mut pair.name.kind {
        for child in children {
            renumber_depth(child, abs_depth + 1, rel_diff, use_relative);
        }
    }
    if let ValueKind::Object(children) = &mut pair.value.kind {
        for child in children {
            renumber_depth(child, abs_depth + 1, rel_diff, use_relative);
        }
    }
}

fn cycle_error(name_stack: &[String], name: &str, simple: bool) -> Error {
    let mut msg = if simple {
        "recursive template loop (simple replacement): ".to_string()
    } else {
        "recursive template loop: ".to_string()
    };
    for entry in name_stack {
        msg.push_str(entry);
        msg.push_str(" --> ");
    }
    msg.push_str(name);
    Error::reference("", msg)
}

/// Expands one full-replacement site and returns the number of pairs now
/// standing in its place.
fn replace_template_full(
    templates: &TemplateMap,
    pairs: &mut Vec<Pair>,
    index: usize,
    keyword: &str,
    recursion_depth: usize,
    name_stack: &mut Vec<String>,
) -> Result<usize> {
    let (template, params) = get_template(templates, &pairs[index].name)?;
    let template_name = template.name.clone();
    if name_stack.contains(&template_name) {
        return Err(cycle_error(name_stack, &template_name, false));
    }
    let body = template.body.clone();
    if body.is_empty() {
        pairs.remove(index);
        return Ok(0);
    }
    let site_depth = pairs[index].depth;
    let count = body.len();
    pairs.splice(index..=index, body);
    for pair in pairs.iter_mut().skip(index).take(count) {
        replace_params(&params, pair);
        if site_depth >= 0 {
            let template_depth = pair.depth;
            renumber_depth(
                pair,
                site_depth,
                site_depth - template_depth,
                template_depth >= 0,
            );
        }
    }
    name_stack.push(template_name);
    let diff = apply_templates(
        templates,
        pairs,
        index,
        Some(count),
        keyword,
        recursion_depth + 1,
        name_stack,
    );
    name_stack.pop();
    let diff = diff?;
    if diff < -(count as isize) {
        return Err(Error::custom("recursive template accounting error"));
    }
    Ok((count as isize + diff) as usize)
}

/// Expands one simple-replacement site: the template must boil down to a
/// single non-object token with an empty value side.
fn replace_template_simple(
    templates: &TemplateMap,
    value: &mut Value,
    keyword: &str,
    recursion_depth: usize,
    name_stack: &mut Vec<String>,
) -> Result<()> {
    if recursion_depth > MAX_RECURSIVE_DEPTH {
        return Err(Error::limit(format!(
            "reached the maximum recursion depth for simple template replacement (depth {})",
            recursion_depth
        )));
    }
    let (template, params) = get_template(templates, value)?;
    let template_name = template.name.clone();
    if name_stack.contains(&template_name) {
        return Err(cycle_error(name_stack, &template_name, true));
    }
    if template.body.is_empty() {
        return Err(Error::structure(
            value.located(),
            format!("{}: an empty template is not allowed", template_name),
        ));
    }
    let mut content_index = None;
    for (i, pair) in template.body.iter().enumerate() {
        if pair.is_empty_or_comment() {
            continue;
        }
        if content_index.is_some() {
            return Err(Error::structure(
                value.located(),
                format!(
                    "{}: only a simple template is allowed (no multiple pairs)",
                    template_name
                ),
            ));
        }
        content_index = Some(i);
    }
    let Some(content_index) = content_index else {
        return Err(Error::structure(
            value.located(),
            format!("{}: only a simple template is allowed (no pairs)", template_name),
        ));
    };
    let pair = &template.body[content_index];
    if !pair.value.is_empty() {
        return Err(Error::structure(
            value.located(),
            format!(
                "{}: only a simple template is allowed (the value must be empty)",
                template_name
            ),
        ));
    }
    if pair.name.is_object() {
        return Err(Error::structure(
            value.located(),
            format!(
                "{}: only a simple template is allowed (the name can't be an object)",
                template_name
            ),
        ));
    }
    *value = pair.name.clone();
    replace_params_value(&params, value);
    if is_use_site(value, keyword) {
        name_stack.push(template_name);
        let result =
            replace_template_simple(templates, value, keyword, recursion_depth + 1, name_stack);
        name_stack.pop();
        result?;
    }
    Ok(())
}

/// Expands all use sites inside `pairs[pair_start..pair_start + count]`.
///
/// Returns how many pairs the slice grew (positive) or shrank (negative).
fn apply_templates(
    templates: &TemplateMap,
    pairs: &mut Vec<Pair>,
    pair_start: usize,
    pair_count: Option<usize>,
    keyword: &str,
    recursion_depth: usize,
    name_stack: &mut Vec<String>,
) -> Result<isize> {
    if recursion_depth > MAX_RECURSIVE_DEPTH {
        return Err(Error::limit(format!(
            "reached the maximum recursion depth for template replacement (depth {})",
            recursion_depth
        )));
    }
    let mut add_remove: isize = 0;
    if pair_start >= pairs.len() {
        return Ok(0);
    }
    let mut limit = pair_start + pair_count.unwrap_or(pairs.len() - pair_start);
    let mut i = pair_start;
    while i < limit && i < pairs.len() {
        if pairs[i].is_object() {
            if let ValueKind::Object(children) = &mut pairs[i].value.kind {
                let mut child_stack = Vec::new();
                apply_templates(templates, children, 0, None, keyword, 0, &mut child_stack)?;
            }
        }
        if is_use_site(&pairs[i].name, keyword) {
            if pairs[i].value.is_empty() {
                // full replacement, the site may become 0, 1 or N pairs
                let inserted = replace_template_full(
                    templates,
                    pairs,
                    i,
                    keyword,
                    recursion_depth,
                    name_stack,
                )?;
                add_remove += inserted as isize - 1;
                limit = (limit as isize + inserted as isize - 1).max(0) as usize;
                i += inserted;
                continue;
            }
            // a use site with a value only allows a simple replacement
            replace_template_simple(
                templates,
                &mut pairs[i].name,
                keyword,
                recursion_depth,
                name_stack,
            )?;
        }
        if is_use_site(&pairs[i].value, keyword) {
            replace_template_simple(
                templates,
                &mut pairs[i].value,
                keyword,
                recursion_depth,
                name_stack,
            )?;
        }
        i += 1;
    }
    Ok(add_remove)
}

/// Expands all template use sites of a tree in place.
///
/// # Errors
///
/// Returns reference errors for unknown templates and wrong argument
/// counts, structure errors for ill-shaped sites and limit errors for
/// cyclic or too deep expansion.
pub fn use_templates(templates: &TemplateMap, value: &mut Value, use_keyword: &str) -> Result<()> {
    let ValueKind::Object(pairs) = &mut value.kind else {
        return Ok(());
    };
    let mut name_stack = Vec::new();
    apply_templates(templates, pairs, 0, None, use_keyword, 0, &mut name_stack)?;
    Ok(())
}
