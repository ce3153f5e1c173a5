//! Data records: field lookup, datapath walking, and value formatting.
//!
//! The merge engine sees all data through [`Record`], which unifies two
//! shapes behind one lookup surface:
//!
//! - `Map`: a [`serde_json::Value`] tree — the common case. Nested maps,
//!   arrays, and scalars all work; anything serializable via `serde` can be
//!   converted with `serde_json::to_value`.
//! - `Object`: a host type implementing [`DataObject`], for records that
//!   expose methods (`data:method` pipeline options) in addition to fields.
//!
//! Attribute-bearing structured data (e.g. parsed XML) uses `@`-prefixed
//! keys for attributes, matching the `quick-xml` serde convention, so a
//! datapath segment like `@status` is an ordinary key lookup.

use std::borrow::Cow;

use serde_json::Value;

/// An object-like data record: named field access plus optional method
/// invocation.
///
/// Field values are returned as owned [`Value`]s; datapath traversal beyond
/// the first segment continues inside the returned tree. Attributes should
/// be surfaced as `@`-prefixed field names.
pub trait DataObject {
    /// Looks up a named field. `None` renders as the empty string.
    fn field(&self, name: &str) -> Option<Value>;

    /// Invokes an instance method (`data:method`). The default
    /// implementation knows no methods, which degrades the option to a
    /// pass-through.
    fn call(&self, method: &str) -> Option<Value> {
        let _ = method;
        None
    }

    /// Invokes a type-level method (`data::method`).
    fn call_static(&self, method: &str) -> Option<Value> {
        let _ = method;
        None
    }
}

/// A borrowed view of the data record a template is merged against.
#[derive(Clone, Copy)]
pub enum Record<'a> {
    /// A JSON-like key-value record.
    Map(&'a Value),
    /// A method-bearing host object.
    Object(&'a dyn DataObject),
}

impl<'a> Record<'a> {
    /// Direct field lookup, without datapath traversal.
    pub(crate) fn field_value(&self, name: &str) -> Option<Cow<'a, Value>> {
        match self {
            Record::Map(value) => value.get(name).map(Cow::Borrowed),
            Record::Object(object) => object.field(name).map(Cow::Owned),
        }
    }

    /// Walks a datapath segment by segment. A missing segment at any depth
    /// yields `None` — there is no partial result.
    pub(crate) fn walk(&self, path: &[String]) -> Option<Cow<'a, Value>> {
        match self {
            Record::Map(value) => walk_value(value, path).map(Cow::Borrowed),
            Record::Object(object) => {
                let (first, rest) = path.split_first()?;
                let value = object.field(first)?;
                if rest.is_empty() {
                    Some(Cow::Owned(value))
                } else {
                    walk_value(&value, rest).map(|v| Cow::Owned(v.clone()))
                }
            }
        }
    }
}

fn walk_value<'v>(value: &'v Value, path: &[String]) -> Option<&'v Value> {
    let mut current = value;
    for segment in path {
        current = current.get(segment.as_str())?;
    }
    Some(current)
}

/// Formats a value for insertion into rendered output.
///
/// Strings are inserted verbatim, null renders empty, and arrays/objects
/// fall back to their JSON representation.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// The emptiness check used by `default(...)` short-circuiting.
///
/// Null, `""`, `"0"`, `false`, numeric zero, and empty collections count as
/// empty.
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
