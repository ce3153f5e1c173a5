//! Engine construction: template parsing and option classification.
//!
//! The builder owns everything configurable up front (delimiters, registry,
//! app binding), parses each template source once, and classifies every raw
//! pipeline token into a [`FieldOption`]. Render calls then dispatch on the
//! classified options without re-inspecting token text.

use std::collections::HashMap;

use serde_json::Value;

use crate::engine::{CompiledTemplate, Engine};
use crate::options::{translate_escapes, Arg, FieldOption, SHORTCUTS};
use crate::parser::{Parser, RawOption, Syntax};
use crate::record::Record;
use crate::registry::{AppBinding, CallbackRegistry};

/// Configures and builds an [`Engine`].
///
/// ```rust
/// use fieldloom::Builder;
/// use serde_json::json;
///
/// let engine = Builder::new()
///     .transform("excite", |args| {
///         json!(format!("{}!", args[0].as_str().unwrap_or_default()))
///     })
///     .build([("t", "{{greeting|excite}}")]);
///
/// let out = engine.render("t", &json!({ "greeting": "hi" })).unwrap();
/// assert_eq!(out, "hi!");
/// ```
pub struct Builder {
    syntax: Syntax,
    registry: CallbackRegistry,
    app: Option<Box<dyn AppBinding>>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            syntax: Syntax::default(),
            registry: CallbackRegistry::new(),
            app: None,
        }
    }

    /// Replaces the field delimiter pair.
    pub fn syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Replaces the whole callback registry.
    pub fn registry(mut self, registry: CallbackRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Binds the application object targeted by `app:` / `app::` options.
    pub fn app(mut self, app: impl AppBinding + 'static) -> Self {
        self.app = Some(Box::new(app));
        self
    }

    /// Registers a named transform. See
    /// [`CallbackRegistry::register_transform`].
    pub fn transform<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.registry.register_transform(name, transform);
        self
    }

    /// Registers a `user:` callback. See
    /// [`CallbackRegistry::register_callback`].
    pub fn callback<F>(mut self, name: impl Into<String>, callback: F) -> Self
    where
        F: for<'a> Fn(&Value, &str, Record<'a>) -> Value + Send + Sync + 'static,
    {
        self.registry.register_callback(name, callback);
        self
    }

    /// Parses and compiles the named templates into an engine.
    ///
    /// Compilation never fails: malformed field bodies and unresolvable
    /// option tokens degrade per the lenient-parse rules instead of
    /// erroring.
    pub fn build<K, V>(self, templates: impl IntoIterator<Item = (K, V)>) -> Engine
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let parser = Parser::new(self.syntax);
        let has_app = self.app.is_some();
        let mut compiled = HashMap::new();

        for (name, source) in templates {
            let parsed = parser.parse(source.as_ref());
            let mut complexity = parsed.complexity;
            let options = parsed
                .options
                .into_iter()
                .map(|(field, raw)| {
                    let resolved = raw
                        .into_iter()
                        .filter_map(|option| resolve_option(option, has_app, &mut complexity))
                        .collect::<Vec<_>>();
                    (field, resolved)
                })
                .collect();
            compiled.insert(
                name.into(),
                CompiledTemplate {
                    fragments: parsed.fragments,
                    datapath: parsed.datapath,
                    options,
                    complexity,
                },
            );
        }

        Engine::new(compiled, self.registry, self.app)
    }
}

/// Classifies one raw pipeline token. Returns `None` when the token is
/// dropped outright (engine verbs missing their required argument, or an
/// `app:` option with no app bound).
fn resolve_option(option: RawOption, has_app: bool, complexity: &mut bool) -> Option<FieldOption> {
    let RawOption { name, args } = option;

    if let Some(args) = args {
        return resolve_call(name, args, complexity);
    }

    if let Some((ns, method)) = name.split_once("::") {
        match ns.to_lowercase().as_str() {
            "app" => {
                return has_app.then(|| FieldOption::App {
                    method: method.to_string(),
                    statik: true,
                });
            }
            "data" => {
                return Some(FieldOption::Data {
                    method: method.to_string(),
                    statik: true,
                });
            }
            _ => {}
        }
    } else if let Some((ns, method)) = name.split_once(':') {
        match ns.to_lowercase().as_str() {
            "app" => {
                return has_app.then(|| FieldOption::App {
                    method: method.to_string(),
                    statik: false,
                });
            }
            "user" => return Some(FieldOption::User(method.to_string())),
            "data" => {
                return Some(FieldOption::Data {
                    method: method.to_string(),
                    statik: false,
                });
            }
            _ => {}
        }
    }

    let name = match SHORTCUTS.get(name.to_lowercase().as_str()) {
        Some(canonical) => canonical.to_string(),
        // Unknown names stay as-is; lookup failure at render time is a
        // pass-through.
        None => name,
    };
    Some(FieldOption::Transform { name, args: None })
}

/// Classifies a call-style token: the engine verbs by name, anything else as
/// a transform invocation with a literal argument list.
fn resolve_call(name: String, args: Vec<String>, complexity: &mut bool) -> Option<FieldOption> {
    match name.to_lowercase().as_str() {
        "render" => {
            let template = args.first()?.trim().to_string();
            if template.is_empty() {
                return None;
            }
            *complexity = true;
            let pass_record = args.get(1).is_some_and(|arg| arg.trim() == "?");
            Some(FieldOption::Render {
                template,
                pass_record,
            })
        }
        "each" => {
            let template = args.first()?.trim().to_string();
            if template.is_empty() {
                return None;
            }
            *complexity = true;
            let separator = args
                .get(1)
                .map(|sep| translate_escapes(sep))
                .unwrap_or_default();
            Some(FieldOption::Each {
                template,
                separator,
            })
        }
        "default" => args.into_iter().next().map(FieldOption::Default),
        _ => Some(FieldOption::Transform {
            name,
            args: Some(
                args.into_iter()
                    .map(|arg| {
                        if arg.trim() == "?" {
                            Arg::Value
                        } else {
                            Arg::Literal(arg)
                        }
                    })
                    .collect(),
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, args: Option<&[&str]>) -> RawOption {
        RawOption {
            name: name.to_string(),
            args: args.map(|args| args.iter().map(|a| a.to_string()).collect()),
        }
    }

    fn resolve(option: RawOption) -> Option<FieldOption> {
        resolve_option(option, true, &mut false)
    }

    #[test]
    fn test_shortcut_resolves_case_insensitively() {
        for token in ["esc", "ESC", "Escape"] {
            assert_eq!(
                resolve(raw(token, None)),
                Some(FieldOption::Transform {
                    name: "escape".to_string(),
                    args: None
                })
            );
        }
    }

    #[test]
    fn test_unknown_bare_name_kept_as_transform() {
        assert_eq!(
            resolve(raw("md555", None)),
            Some(FieldOption::Transform {
                name: "md555".to_string(),
                args: None
            })
        );
    }

    #[test]
    fn test_call_style_value_placeholder() {
        let opt = resolve(raw("sprintf", Some(&["%1.6f", " ?"])));
        assert_eq!(
            opt,
            Some(FieldOption::Transform {
                name: "sprintf".to_string(),
                args: Some(vec![Arg::Literal("%1.6f".to_string()), Arg::Value]),
            })
        );
    }

    #[test]
    fn test_render_variants() {
        assert_eq!(
            resolve(raw("render", Some(&["sub"]))),
            Some(FieldOption::Render {
                template: "sub".to_string(),
                pass_record: false
            })
        );
        assert_eq!(
            resolve(raw("render", Some(&["sub", " ?"]))),
            Some(FieldOption::Render {
                template: "sub".to_string(),
                pass_record: true
            })
        );
        assert_eq!(resolve(raw("render", Some(&[]))), None);
    }

    #[test]
    fn test_each_translates_separator_escapes() {
        assert_eq!(
            resolve(raw("each", Some(&["row", "\\n"]))),
            Some(FieldOption::Each {
                template: "row".to_string(),
                separator: "\n".to_string()
            })
        );
        assert_eq!(resolve(raw("each", Some(&[]))), None);
    }

    #[test]
    fn test_render_sets_complexity() {
        let mut complexity = false;
        resolve_option(raw("render", Some(&["sub"])), false, &mut complexity);
        assert!(complexity);
    }

    #[test]
    fn test_default_requires_argument() {
        assert_eq!(
            resolve(raw("default", Some(&["fallback"]))),
            Some(FieldOption::Default("fallback".to_string()))
        );
        assert_eq!(resolve(raw("default", Some(&[]))), None);
    }

    #[test]
    fn test_namespaced_options() {
        assert_eq!(
            resolve(raw("user:hook", None)),
            Some(FieldOption::User("hook".to_string()))
        );
        assert_eq!(
            resolve(raw("app:fmt", None)),
            Some(FieldOption::App {
                method: "fmt".to_string(),
                statik: false
            })
        );
        assert_eq!(
            resolve(raw("app::fmt", None)),
            Some(FieldOption::App {
                method: "fmt".to_string(),
                statik: true
            })
        );
        assert_eq!(
            resolve(raw("data:len", None)),
            Some(FieldOption::Data {
                method: "len".to_string(),
                statik: false
            })
        );
    }

    #[test]
    fn test_app_option_dropped_without_app() {
        assert_eq!(resolve_option(raw("app:fmt", None), false, &mut false), None);
        assert_eq!(resolve_option(raw("app::fmt", None), false, &mut false), None);
    }

    #[test]
    fn test_unknown_namespace_stays_verbatim() {
        assert_eq!(
            resolve(raw("xxx:method", None)),
            Some(FieldOption::Transform {
                name: "xxx:method".to_string(),
                args: None
            })
        );
    }
}
