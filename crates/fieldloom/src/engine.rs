//! The merge engine: fragment assembly, option pipelines, and repetition.
//!
//! Rendering walks a template's fragment list, resolves each field against
//! the data record (directly or through a datapath), runs the field's option
//! pipeline, and appends the formatted result. Templates without datapaths
//! skip the path machinery entirely.
//!
//! Two records are threaded through every nested call: the current record
//! the template is merged against, and the unchanged top-level root record
//! that absolute datapaths resolve from.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::{json, Value};

use crate::options::{Arg, FieldOption};
use crate::parser::{Datapath, Fragment};
use crate::record::{is_empty_value, value_to_string, DataObject, Record};
use crate::registry::{AppBinding, CallbackRegistry};
use crate::sink::RowSink;
use crate::Error;

/// One parsed and classified template.
pub(crate) struct CompiledTemplate {
    pub fragments: Vec<Fragment>,
    pub datapath: HashMap<String, Datapath>,
    pub options: HashMap<String, Vec<FieldOption>>,
    /// Datapaths or nested sub-templates present; selects the path-aware
    /// merge.
    pub complexity: bool,
}

/// An immutable template set plus its callback registry, ready to render.
///
/// Engines are built by [`Builder`](crate::Builder) and hold no mutable
/// state; a single engine can serve concurrent render calls from multiple
/// threads.
pub struct Engine {
    templates: HashMap<String, CompiledTemplate>,
    registry: CallbackRegistry,
    app: Option<Box<dyn AppBinding>>,
}

impl Engine {
    pub(crate) fn new(
        templates: HashMap<String, CompiledTemplate>,
        registry: CallbackRegistry,
        app: Option<Box<dyn AppBinding>>,
    ) -> Self {
        Self {
            templates,
            registry,
            app,
        }
    }

    /// Whether a template was registered under `name`.
    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Renders one template against a map-like record.
    ///
    /// # Errors
    ///
    /// [`Error::TemplateNotFound`] when `name` (or a template referenced by
    /// a nested `render`/`each` option) was never registered.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, Error> {
        let record = Record::Map(data);
        self.merge(name, record, record)
    }

    /// Renders one template against a method-bearing record.
    pub fn render_object(&self, name: &str, data: &dyn DataObject) -> Result<String, Error> {
        let record = Record::Object(data);
        self.merge(name, record, record)
    }

    /// Renders `name` once per row of `data`, joining rows with `separator`,
    /// and returns the accumulated output.
    ///
    /// Arrays contribute one row per element and maps one row per member
    /// value; a scalar is a single row and null is zero rows. Scalar rows
    /// are wrapped as `{ "item": value }` so the row template can address
    /// them as `{{item}}`.
    pub fn each(&self, name: &str, data: &Value, separator: &str) -> Result<String, Error> {
        let mut out = String::new();
        self.each_into(name, data, separator, &mut out)?;
        Ok(out)
    }

    /// Streaming form of [`each`](Self::each): pushes each rendered row into
    /// `sink` as soon as it is produced, keeping memory bounded by one row.
    ///
    /// The chunks pushed concatenate to exactly the output of `each`.
    pub fn each_into(
        &self,
        name: &str,
        data: &Value,
        separator: &str,
        sink: &mut dyn RowSink,
    ) -> Result<(), Error> {
        self.each_rows(name, data, Record::Map(data), separator, sink)
    }

    fn each_rows(
        &self,
        name: &str,
        collection: &Value,
        root: Record<'_>,
        separator: &str,
        sink: &mut dyn RowSink,
    ) -> Result<(), Error> {
        if !self.templates.contains_key(name) {
            return Err(Error::TemplateNotFound(name.to_string()));
        }
        match collection {
            Value::Array(rows) => {
                for (index, row) in rows.iter().enumerate() {
                    self.push_row(name, row, root, separator, index, sink)?;
                }
            }
            Value::Object(members) => {
                for (index, row) in members.values().enumerate() {
                    self.push_row(name, row, root, separator, index, sink)?;
                }
            }
            Value::Null => {}
            // A repeated element occurring once, e.g. out of parsed XML.
            scalar => self.push_row(name, scalar, root, separator, 0, sink)?,
        }
        Ok(())
    }

    fn push_row(
        &self,
        name: &str,
        row: &Value,
        root: Record<'_>,
        separator: &str,
        index: usize,
        sink: &mut dyn RowSink,
    ) -> Result<(), Error> {
        let rendered = match row {
            Value::Object(_) => self.merge(name, Record::Map(row), root)?,
            scalar => {
                let wrapped = json!({ "item": scalar });
                self.merge(name, Record::Map(&wrapped), root)?
            }
        };
        if index > 0 && !separator.is_empty() {
            let mut chunk = String::with_capacity(separator.len() + rendered.len());
            chunk.push_str(separator);
            chunk.push_str(&rendered);
            sink.push_row(&chunk);
        } else {
            sink.push_row(&rendered);
        }
        Ok(())
    }

    fn merge<'a>(
        &self,
        name: &str,
        data: Record<'a>,
        root: Record<'a>,
    ) -> Result<String, Error> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;

        let mut out = String::new();
        for fragment in &template.fragments {
            let field = match fragment {
                Fragment::Literal(text) => {
                    out.push_str(text);
                    continue;
                }
                Fragment::Field(field) => field,
            };
            let value = if template.complexity {
                lookup(template, field, data, root)
            } else {
                data.field_value(field).unwrap_or(Cow::Owned(Value::Null))
            };
            let value = match template.options.get(field.as_str()) {
                Some(options) if !options.is_empty() => {
                    self.apply_options(value, field, data, root, options)?
                }
                _ => value,
            };
            out.push_str(&value_to_string(&value));
        }
        Ok(out)
    }

    /// Runs a field's option pipeline, left to right.
    ///
    /// An empty incoming value hands the result to the pipeline's first
    /// `default(...)` immediately, before any other stage runs; a value that
    /// becomes empty mid-pipeline fires the next `default(...)` it reaches.
    fn apply_options<'a>(
        &self,
        mut value: Cow<'a, Value>,
        field: &str,
        data: Record<'a>,
        root: Record<'a>,
        options: &[FieldOption],
    ) -> Result<Cow<'a, Value>, Error> {
        if is_empty_value(&value) {
            for option in options {
                if let FieldOption::Default(fallback) = option {
                    return Ok(Cow::Owned(Value::String(fallback.clone())));
                }
            }
        }

        for option in options {
            match option {
                FieldOption::Default(fallback) => {
                    if is_empty_value(&value) {
                        return Ok(Cow::Owned(Value::String(fallback.clone())));
                    }
                }
                FieldOption::Transform { name, args } => {
                    // Unknown names pass the value through untouched.
                    if let Some(transform) = self.registry.transform(name) {
                        let out = match args {
                            None => transform(std::slice::from_ref(value.as_ref())),
                            Some(args) => transform(&resolve_args(args, value.as_ref())),
                        };
                        value = Cow::Owned(out);
                    }
                }
                FieldOption::Render {
                    template,
                    pass_record,
                } => {
                    let rendered = if *pass_record {
                        self.merge(template, data, root)?
                    } else {
                        self.merge(template, Record::Map(value.as_ref()), root)?
                    };
                    value = Cow::Owned(Value::String(rendered));
                }
                FieldOption::Each {
                    template,
                    separator,
                } => {
                    let mut rows = String::new();
                    self.each_rows(template, value.as_ref(), root, separator, &mut rows)?;
                    value = Cow::Owned(Value::String(rows));
                }
                FieldOption::App { method, statik } => {
                    if let Some(app) = &self.app {
                        let result = if *statik {
                            app.call_static(method, value.as_ref(), field, data)
                        } else {
                            app.call(method, value.as_ref(), field, data)
                        };
                        if let Some(out) = result {
                            value = Cow::Owned(out);
                        }
                    }
                }
                FieldOption::User(name) => {
                    if let Some(callback) = self.registry.callback(name) {
                        value = Cow::Owned(callback(value.as_ref(), field, data));
                    }
                }
                FieldOption::Data { method, statik } => {
                    if let Record::Object(object) = data {
                        let result = if *statik {
                            object.call_static(method)
                        } else {
                            object.call(method)
                        };
                        if let Some(out) = result {
                            value = Cow::Owned(out);
                        }
                    }
                }
            }
        }
        Ok(value)
    }
}

/// Path-aware field resolution: relative datapaths walk from the current
/// record, absolute ones from the root record of the outermost call.
fn lookup<'a>(
    template: &CompiledTemplate,
    field: &str,
    data: Record<'a>,
    root: Record<'a>,
) -> Cow<'a, Value> {
    let found = match template.datapath.get(field) {
        Some(Datapath::Relative(path)) => data.walk(path),
        Some(Datapath::Absolute(path)) => root.walk(path),
        None => data.field_value(field),
    };
    found.unwrap_or(Cow::Owned(Value::Null))
}

fn resolve_args(args: &[Arg], value: &Value) -> Vec<Value> {
    args.iter()
        .map(|arg| match arg {
            Arg::Literal(text) => Value::String(text.clone()),
            Arg::Value => value.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Builder;

    #[test]
    fn test_missing_template_is_an_error() {
        let engine = Builder::new().build([("a", "x")]);
        assert!(matches!(
            engine.render("b", &json!({})),
            Err(Error::TemplateNotFound(name)) if name == "b"
        ));
        assert!(engine.each("b", &json!([]), "").is_err());
        assert!(engine.has_template("a"));
        assert!(!engine.has_template("b"));
    }

    #[test]
    fn test_missing_field_renders_empty() {
        let engine = Builder::new().build([("t", "[{{gone}}]")]);
        assert_eq!(engine.render("t", &json!({})).unwrap(), "[]");
    }

    #[test]
    fn test_each_row_shapes() {
        let engine = Builder::new().build([("cell", "{{item}}")]);
        assert_eq!(engine.each("cell", &json!(["a", "b"]), ",").unwrap(), "a,b");
        assert_eq!(engine.each("cell", &json!("solo"), ",").unwrap(), "solo");
        assert_eq!(engine.each("cell", &Value::Null, ",").unwrap(), "");
        let members = json!({ "x": 1, "y": 2 });
        assert_eq!(engine.each("cell", &members, "-").unwrap(), "1-2");
    }

    #[test]
    fn test_separator_only_between_rows() {
        let engine = Builder::new().build([("cell", "{{item}}")]);
        assert_eq!(engine.each("cell", &json!(["x"]), ", ").unwrap(), "x");
        assert_eq!(
            engine.each("cell", &json!([1, 2, 3]), ", ").unwrap(),
            "1, 2, 3"
        );
    }
}
