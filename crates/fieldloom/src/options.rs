//! Resolved field-option descriptors.
//!
//! The builder classifies each raw pipeline token into exactly one of the
//! variants below; the engine evaluates them in template order with a single
//! dispatch per stage. Unresolvable stages are represented the same way as
//! resolvable ones — the degrade-to-no-op decision happens at render time,
//! when the registry lookup fails.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// One argument of a call-style transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Arg {
    /// A literal from the template text.
    Literal(String),
    /// The `?` placeholder: the field's current pipeline value.
    Value,
}

/// One resolved stage of a field's option pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldOption {
    /// A named transform from the callback registry. `args` is `None` for
    /// bare tokens (the transform receives the value alone) and `Some` for
    /// call-style tokens (the transform receives exactly the listed
    /// arguments, with `?` replaced by the value).
    Transform {
        name: String,
        args: Option<Vec<Arg>>,
    },
    /// `default("fallback")` — short-circuits the pipeline with the literal
    /// when the value is empty.
    Default(String),
    /// `render("sub")` / `render("sub", ?)` — renders a sub-template using
    /// the field value (or the whole record, with `?`) as its data root.
    Render {
        template: String,
        pass_record: bool,
    },
    /// `each("sub", "sep")` — treats the value as a row collection and
    /// renders the sub-template once per row.
    Each {
        template: String,
        separator: String,
    },
    /// `app:method` / `app::method` — a method on the bound application
    /// object.
    App {
        method: String,
        statik: bool,
    },
    /// `user:name` — a callback from the registry, looked up at render time.
    User(String),
    /// `data:method` / `data::method` — a method invoked on the data record
    /// itself; a no-op for map records.
    Data {
        method: String,
        statik: bool,
    },
}

/// Aliases for built-in transforms, matched case-insensitively.
pub(crate) static SHORTCUTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("esc", "escape"),
        ("escape", "escape"),
        ("urlenc", "urlencode"),
        ("rawurlenc", "rawurlencode"),
        ("ucase", "uppercase"),
        ("lcase", "lowercase"),
        ("int", "int"),
        ("float", "float"),
        ("trim", "trim"),
    ])
});

/// Translates escape tokens (`\n`, `\t`, ...) in a separator argument to
/// their literal characters.
pub(crate) fn translate_escapes(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{0B}'),
            Some('e') => out.push('\u{1B}'),
            Some('f') => out.push('\u{0C}'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_known_escapes() {
        assert_eq!(translate_escapes("a\\nb\\tc"), "a\nb\tc");
        assert_eq!(translate_escapes("\\r\\n"), "\r\n");
    }

    #[test]
    fn test_translate_backslash() {
        assert_eq!(translate_escapes("a\\\\n"), "a\\n");
    }

    #[test]
    fn test_unknown_escape_kept() {
        assert_eq!(translate_escapes("\\x"), "\\x");
        assert_eq!(translate_escapes("end\\"), "end\\");
    }

    #[test]
    fn test_shortcut_lookup() {
        assert_eq!(SHORTCUTS.get("esc"), Some(&"escape"));
        assert_eq!(SHORTCUTS.get("ucase"), Some(&"uppercase"));
        assert_eq!(SHORTCUTS.get("nope"), None);
    }
}
