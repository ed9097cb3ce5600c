//! Translations, profiles and variables.
//!
//! All three use the same mechanism with different keywords and prefixes: a
//! block collects id → value entries, then text values of the form
//! `<prefix><id>)` are rewritten to the stored replacement.
//!
//! ```text
//! translations
//!     hello EN = Hello
//!     hello DE = Hallo
//! greeting = tr(hello)
//! ```
//!
//! A translation entry names a two-element array `[<id>, <language>]`;
//! variables carry a bare id and live under the empty language. The
//! replacement value may be of any type; when it is an array or object,
//! substitution continues inside it.
//!
//! ## Usage
//!
//! ```rust
//! use tml_cfg::translation::apply_translations;
//! use tml_cfg::parse_str;
//!
//! let mut root = parse_str(
//!     "t.tml",
//!     "translations\n\thello EN = Hello\n\thello DE = Hallo\ngreeting = tr(hello)\n",
//! )
//! .unwrap();
//! apply_translations(&mut root, "translations", "tr(", "EN").unwrap();
//! assert_eq!(root.object_get_text("greeting"), Some("Hello"));
//! ```

use crate::{Error, Pair, Result, Value, ValueKind};
use indexmap::IndexMap;

const MAX_SUBSTITUTION_DEPTH: usize = 50;

/// One collected replacement.
#[derive(Clone, Debug)]
pub struct Translation {
    pub id: String,
    pub value: Value,
}

/// Translation id → replacement, in declaration order.
pub type TranslationMap = IndexMap<String, Translation>;

/// Language id → translations. Variables live under the empty language id.
pub type LanguageMap = IndexMap<String, TranslationMap>;

/// Adds the entries of a translations block to a language map.
///
/// Every content pair must name a two-element text array
/// `[<translation-id>, <language-id>]`; empty-line and comment records are
/// skipped.
///
/// # Errors
///
/// Returns structure errors for ill-shaped entries and a reference error
/// for a duplicate id within one language.
pub fn add_translations(languages: &mut LanguageMap, pairs: &[Pair]) -> Result<()> {
    for pair in pairs {
        if pair.is_empty_or_comment() {
            continue;
        }
        let Some(elements) = pair.name.as_array() else {
            return Err(Error::structure(pair.name.located(), "is not an array"));
        };
        if elements.len() != 2 {
            return Err(Error::structure(
                pair.name.located(),
                "must have a size of 2",
            ));
        }
        let Some(id) = elements[0].as_str() else {
            return Err(Error::structure(
                pair.name.located(),
                "the first element must be a text",
            ));
        };
        let Some(language) = elements[1].as_str() else {
            return Err(Error::structure(
                pair.name.located(),
                "the second element must be a text",
            ));
        };
        insert_translation(languages, pair, id, language)?;
    }
    Ok(())
}

/// Adds the entries of a variables block under the empty language id.
///
/// A variable pair names either a bare text or a one-element text array.
///
/// # Errors
///
/// Same as [`add_translations`].
pub fn add_variables(languages: &mut LanguageMap, pairs: &[Pair]) -> Result<()> {
    for pair in pairs {
        if pair.is_empty_or_comment() {
            continue;
        }
        let id = match &pair.name.kind {
            ValueKind::Text { text, .. } => Some(text.as_str()),
            ValueKind::Array(elements) if elements.len() == 1 => elements[0].as_str(),
            _ => None,
        };
        let Some(id) = id else {
            return Err(Error::structure(
                pair.name.located(),
                "a variable needs a single text id",
            ));
        };
        insert_translation(languages, pair, id, "")?;
    }
    Ok(())
}

fn insert_translation(
    languages: &mut LanguageMap,
    pair: &Pair,
    id: &str,
    language: &str,
) -> Result<()> {
    let translations = languages.entry(language.to_string()).or_default();
    if translations.contains_key(id) {
        return Err(Error::reference(
            pair.name.located(),
            format!("translation id '{}' is already used", id),
        ));
    }
    translations.insert(
        id.to_string(),
        Translation {
            id: id.to_string(),
            value: pair.value.clone(),
        },
    );
    Ok(())
}

fn collect_blocks(
    languages: &mut LanguageMap,
    value: &mut Value,
    remove: bool,
    keyword: &str,
    variables: bool,
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
        let Some(entries) = pairs[i].value.as_object() else {
            return Err(Error::structure(pairs[i].value.located(), "is no object"));
        };
        if variables {
            add_variables(languages, entries)?;
        } else {
            add_translations(languages, entries)?;
        }
        if remove {
            pairs.remove(i);
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Collects all `<keyword>` blocks of the top-level object.
///
/// # Errors
///
/// Same as [`add_translations`].
pub fn collect_translations(
    languages: &mut LanguageMap,
    value: &mut Value,
    remove: bool,
    keyword: &str,
) -> Result<()> {
    collect_blocks(languages, value, remove, keyword, false)
}

/// Collects all `<keyword>` variable blocks of the top-level object.
///
/// # Errors
///
/// Same as [`add_variables`].
pub fn collect_variables(
    languages: &mut LanguageMap,
    value: &mut Value,
    remove: bool,
    keyword: &str,
) -> Result<()> {
    collect_blocks(languages, value, remove, keyword, true)
}

fn substitute(
    translations: &TranslationMap,
    prefix: &str,
    value: &mut Value,
    substitution_depth: usize,
) -> Result<()> {
    if let ValueKind::Text { text, .. } = &value.kind {
        if text.len() < prefix.len() + 1 || !text.starts_with(prefix) || !text.ends_with(')') {
            return Ok(());
        }
        let id = text[prefix.len()..text.len() - 1].to_string();
        let Some(translation) = translations.get(&id) else {
            return Err(Error::reference(
                value.located(),
                format!("can't find translation id '{}'", id),
            ));
        };
        *value = translation.value.clone();
        // texts are taken as-is; arrays and objects may carry further
        // references
        if value.is_array() || value.is_object() {
            if substitution_depth >= MAX_SUBSTITUTION_DEPTH {
                return Err(Error::limit(format!(
                    "reached the maximum substitution depth (depth {})",
                    substitution_depth + 1
                )));
            }
            substitute(translations, prefix, value, substitution_depth + 1)?;
        }
        return Ok(());
    }
    match &mut value.kind {
        ValueKind::Array(elements) => {
            for element in elements {
                substitute(translations, prefix, element, substitution_depth)?;
            }
            Ok(())
        }
        ValueKind::Object(pairs) => {
            for pair in pairs {
                substitute(translations, prefix, &mut pair.name, substitution_depth)?;
                substitute(translations, prefix, &mut pair.value, substitution_depth)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Rewrites every text `<prefix><id>)` of the tree with its replacement.
///
/// # Errors
///
/// Returns a reference error for an unknown id and a limit error when
/// substituted values keep referring to further references too deeply.
pub fn use_translations(
    translations: &TranslationMap,
    prefix: &str,
    value: &mut Value,
) -> Result<()> {
    substitute(translations, prefix, value, 0)
}

/// Selects the translations of `language_id` and rewrites the tree.
///
/// # Errors
///
/// Returns a reference error when the language is unknown.
pub fn use_language(
    languages: &LanguageMap,
    language_id: &str,
    prefix: &str,
    value: &mut Value,
) -> Result<()> {
    let Some(translations) = languages.get(language_id) else {
        return Err(Error::reference(
            "",
            format!("can't find a translation map for language id '{}'", language_id),
        ));
    };
    use_translations(translations, prefix, value)
}

/// Collects `<keyword>` blocks, removes them and substitutes the tree.
///
/// An empty `language_id` selects the first collected language.
///
/// # Errors
///
/// Collection and substitution errors, see [`add_translations`] and
/// [`use_translations`].
pub fn apply_translations(
    value: &mut Value,
    keyword: &str,
    prefix: &str,
    language_id: &str,
) -> Result<()> {
    let mut languages = LanguageMap::new();
    collect_translations(&mut languages, value, true, keyword)?;
    let empty = TranslationMap::new();
    let translations = if language_id.is_empty() {
        languages.first().map(|(_, map)| map).unwrap_or(&empty)
    } else {
        languages.get(language_id).ok_or_else(|| {
            Error::reference(
                "",
                format!("can't find a translation map for language id '{}'", language_id),
            )
        })?
    };
    use_translations(translations, prefix, value)
}

/// Collects `<keyword>` variable blocks, removes them and substitutes.
///
/// # Errors
///
/// Same as [`apply_translations`].
pub fn apply_variables(value: &mut Value, keyword: &str, prefix: &str) -> Result<()> {
    let mut languages = LanguageMap::new();
    collect_variables(&mut languages, value, true, keyword)?;
    let empty = TranslationMap::new();
    let translations = languages.get("").unwrap_or(&empty);
    use_translations(translations, prefix, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    #[test]
    fn test_language_selection() {
        let source =
            "translations\n\thello EN = Hello\n\thello DE = Hallo\ngreeting = tr(hello)\n";
        let mut root = parse_str("t.tml", source).unwrap();
        apply_translations(&mut root, "translations", "tr(", "DE").unwrap();
        assert_eq!(root.object_get_text("greeting"), Some("Hallo"));

        // the empty language picks the first collected one
        let mut root = parse_str("t.tml", source).unwrap();
        apply_translations(&mut root, "translations", "tr(", "").unwrap();
        assert_eq!(root.object_get_text("greeting"), Some("Hello"));
    }

    #[test]
    fn test_replacement_may_be_any_value() {
        let mut root = parse_str(
            "t.tml",
            "translations\n\tsize EN = 1 2 3\ndim = tr(size)\n",
        )
        .unwrap();
        apply_translations(&mut root, "translations", "tr(", "EN").unwrap();
        assert_eq!(root.object_get_value("dim").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_id_is_strict() {
        let mut root = parse_str(
            "t.tml",
            "translations\n\thello EN = Hello\ngreeting = tr(missing)\n",
        )
        .unwrap();
        let err = apply_translations(&mut root, "translations", "tr(", "EN").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_unmatched_text_is_unchanged() {
        let mut root = parse_str(
            "t.tml",
            "translations\n\thello EN = Hello\na = tr(\nb = almost-tr(x)\nc = tr(hello\n",
        )
        .unwrap();
        apply_translations(&mut root, "translations", "tr(", "EN").unwrap();
        assert_eq!(root.object_get_text("a"), Some("tr("));
        assert_eq!(root.object_get_text("b"), Some("almost-tr(x)"));
        assert_eq!(root.object_get_text("c"), Some("tr(hello"));
    }

    #[test]
    fn test_duplicate_id_per_language() {
        let mut root = parse_str(
            "t.tml",
            "translations\n\thello EN = Hi\n\thello EN = Hello\n",
        )
        .unwrap();
        let mut languages = LanguageMap::new();
        let err =
            collect_translations(&mut languages, &mut root, true, "translations").unwrap_err();
        assert!(err.to_string().contains("already used"));
    }

    #[test]
    fn test_variables_with_dollar_prefix() {
        let mut root = parse_str(
            "t.tml",
            "variables\n\twidth = 800\nwindow = $(width)\n",
        )
        .unwrap();
        apply_variables(&mut root, "variables", "$(").unwrap();
        assert_eq!(root.object_get_int("window"), Some(800));
    }

    #[test]
    fn test_profiles_use_same_mechanism() {
        let mut root = parse_str(
            "t.tml",
            "profiles\n\tport P1 = 8080\n\tport P2 = 9090\nlisten = pr(port)\n",
        )
        .unwrap();
        apply_translations(&mut root, "profiles", "pr(", "P2").unwrap();
        assert_eq!(root.object_get_int("listen"), Some(9090));
    }

    #[test]
    fn test_substitution_recurses_into_complex_replacements() {
        let mut root = parse_str(
            "t.tml",
            "variables\n\tinner = 7\n\touter = a $(inner) b\nx = $(outer)\n",
        )
        .unwrap();
        apply_variables(&mut root, "variables", "$(").unwrap();
        let arr = root.object_get_value("x").unwrap().as_array().unwrap();
        assert_eq!(arr[1].as_i32(), Some(7));
    }

    #[test]
    fn test_names_are_substituted_too() {
        let mut root = parse_str(
            "t.tml",
            "variables\n\tkey = width\n$(key) = 1\n",
        )
        .unwrap();
        apply_variables(&mut root, "variables", "$(").unwrap();
        assert_eq!(root.object_get_int("width"), Some(1));
    }
}
