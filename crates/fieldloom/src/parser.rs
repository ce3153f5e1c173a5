//! Template parsing: raw text to fragment lists with field options.
//!
//! A template is split on a configurable `(open, close)` delimiter pair into
//! alternating literal and field fragments. A field body is itself split on
//! `|` into a head and zero or more option tokens:
//!
//! ```text
//! {{ name = path/to/value | opt1 | opt2(arg1, arg2) }}
//!    \______head________/   \________pipeline_____/
//! ```
//!
//! The head carries the field name and an optional datapath (`name=rel/path`
//! or `name=/abs/path`). Call-style option arguments are a quote-aware,
//! comma-separated literal list; `?` is a placeholder for the field's own
//! value.
//!
//! Parsing is lenient by design: empty field bodies are skipped, stray close
//! delimiters are dropped, and an unclosed field consumes to the end of the
//! input. Raw option tokens are classified later, by the builder.

use std::collections::HashMap;

use crate::Error;

/// The delimiter pair recognized as field markers.
///
/// The default is `{{` / `}}`. Both markers must be non-empty; this is the
/// only parser configuration surface.
///
/// # Example
///
/// ```rust
/// use fieldloom::{Builder, Syntax};
/// use serde_json::json;
///
/// let syntax = Syntax::new("%%", "%%").unwrap();
/// let engine = Builder::new()
///     .syntax(syntax)
///     .build([("t", "Hello, %%name%%!")]);
///
/// let out = engine.render("t", &json!({ "name": "world" })).unwrap();
/// assert_eq!(out, "Hello, world!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    open: String,
    close: String,
}

impl Default for Syntax {
    fn default() -> Self {
        Self {
            open: "{{".to_string(),
            close: "}}".to_string(),
        }
    }
}

impl Syntax {
    /// Creates a delimiter pair, rejecting empty markers.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, Error> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() {
            return Err(Error::Syntax(
                "field delimiters must be non-empty".to_string(),
            ));
        }
        Ok(Self { open, close })
    }

    /// The opening field marker.
    pub fn open(&self) -> &str {
        &self.open
    }

    /// The closing field marker.
    pub fn close(&self) -> &str {
        &self.close
    }
}

/// One entry of a parsed template, in render order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Literal template text, emitted verbatim.
    Literal(String),
    /// A field placeholder, resolved against the data record by name.
    Field(String),
}

/// Where a field's value is read from when it is not a direct key lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datapath {
    /// `name=path/to/value` — walked from the field's own record; the field
    /// name is the first segment.
    Relative(Vec<String>),
    /// `name=/path/to/value` — walked from the top-level root record of the
    /// outermost render/each call; the field name is not part of the path.
    Absolute(Vec<String>),
}

/// An option token as written in the template, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawOption {
    pub name: String,
    /// `Some` for call-style tokens (`name(...)`), `None` for bare names.
    pub args: Option<Vec<String>>,
}

/// The parse result for one template.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedTemplate {
    pub fragments: Vec<Fragment>,
    pub datapath: HashMap<String, Datapath>,
    pub options: HashMap<String, Vec<RawOption>>,
    /// Set when any field carries a datapath; the builder also sets it for
    /// nested render/each options.
    pub complexity: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Parser {
    syntax: Syntax,
}

impl Parser {
    pub fn new(syntax: Syntax) -> Self {
        Self { syntax }
    }

    /// Splits one template source into fragments and field tables.
    pub fn parse(&self, source: &str) -> ParsedTemplate {
        let open = self.syntax.open.as_str();
        let close = self.syntax.close.as_str();
        let mut parsed = ParsedTemplate::default();
        let mut rest = source;

        loop {
            match (rest.find(open), rest.find(close)) {
                (None, None) => {
                    push_literal(&mut parsed, rest);
                    break;
                }
                // `<=` so identical open/close markers read as an open.
                (Some(at), Some(c)) if at <= c => {
                    rest = self.consume_field(rest, at, &mut parsed);
                }
                (Some(at), None) => {
                    rest = self.consume_field(rest, at, &mut parsed);
                }
                (_, Some(at)) => {
                    // Stray close delimiter: keep the text, drop the marker.
                    push_literal(&mut parsed, &rest[..at]);
                    rest = &rest[at + close.len()..];
                }
            }
        }

        parsed
    }

    /// Consumes the field opening at byte `at` and returns the remaining
    /// input.
    fn consume_field<'s>(&self, rest: &'s str, at: usize, parsed: &mut ParsedTemplate) -> &'s str {
        let close = self.syntax.close.as_str();
        push_literal(parsed, &rest[..at]);
        let body_rest = &rest[at + self.syntax.open.len()..];
        // Unclosed field: the body runs to the end of the input.
        let (body, after) = match body_rest.find(close) {
            Some(end) => (&body_rest[..end], &body_rest[end + close.len()..]),
            None => (body_rest, ""),
        };
        self.parse_field(body, parsed);
        after
    }

    /// Parses one field body: head (name + optional datapath) and pipeline.
    fn parse_field(&self, body: &str, parsed: &mut ParsedTemplate) {
        let mut tokens = body
            .split('|')
            .map(str::trim)
            .filter(|part| !part.is_empty());

        let Some(head) = tokens.next() else {
            // Empty field body, e.g. `{{}}` or `{{ | }}`.
            return;
        };

        let (name, datapath) = parse_head(head);
        let options = tokens.map(parse_option).collect::<Vec<_>>();

        parsed.fragments.push(Fragment::Field(name.clone()));
        if let Some(path) = datapath {
            parsed.complexity = true;
            parsed.datapath.insert(name.clone(), path);
        }
        parsed.options.insert(name, options);
    }
}

fn push_literal(parsed: &mut ParsedTemplate, text: &str) {
    if !text.is_empty() {
        parsed.fragments.push(Fragment::Literal(text.to_string()));
    }
}

/// Splits a field head into its name and optional datapath.
fn parse_head(head: &str) -> (String, Option<Datapath>) {
    let Some((name, path)) = head.split_once('=') else {
        return (head.to_string(), None);
    };
    let name = name.to_string();
    let datapath = match path.strip_prefix('/') {
        Some(absolute) => Datapath::Absolute(absolute.split('/').map(str::to_string).collect()),
        None => {
            let mut segments = vec![name.clone()];
            segments.extend(path.split('/').map(str::to_string));
            Datapath::Relative(segments)
        }
    };
    (name, Some(datapath))
}

/// Parses one pipeline token into a raw option.
fn parse_option(token: &str) -> RawOption {
    match token.find('(') {
        Some(at) => {
            let inner = token[at + 1..].trim_end_matches(')');
            RawOption {
                name: token[..at].to_string(),
                args: Some(split_args(inner)),
            }
        }
        // No call syntax; the whole token is the option name.
        None => RawOption {
            name: token.to_string(),
            args: None,
        },
    }
}

/// Splits a call-argument list on commas, honoring double quotes.
///
/// A quote opens an enclosure only at the start of an argument (leading
/// whitespace before it is skipped); anywhere else it is a literal
/// character. Inside an enclosure, `""` is an escaped quote and an unclosed
/// enclosure runs to the end of the list. Unquoted arguments keep their
/// surrounding whitespace.
fn split_args(src: &str) -> Vec<String> {
    if src.trim().is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut rest = src;
    loop {
        let trimmed = rest.trim_start();
        if let Some(quoted) = trimmed.strip_prefix('"') {
            let mut field = String::new();
            let mut chars = quoted.chars();
            while let Some(c) = chars.next() {
                if c != '"' {
                    field.push(c);
                    continue;
                }
                if chars.clone().next() == Some('"') {
                    chars.next();
                    field.push('"');
                    continue;
                }
                break;
            }
            args.push(field);
            // Anything between the closing quote and the next comma is
            // dropped.
            match chars.as_str().find(',') {
                Some(at) => rest = &chars.as_str()[at + 1..],
                None => break,
            }
        } else {
            match rest.find(',') {
                Some(at) => {
                    args.push(rest[..at].to_string());
                    rest = &rest[at + 1..];
                }
                None => {
                    args.push(rest.to_string());
                    break;
                }
            }
        }
    }
    args
}
