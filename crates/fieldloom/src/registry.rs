//! Callback registration: named transforms, user callbacks, app bindings.
//!
//! All render-time name lookups go through an explicit [`CallbackRegistry`]
//! owned by the engine — there is no process-global state. Unknown names
//! degrade to pass-through at render time; registration order is
//! last-write-wins.

use std::collections::HashMap;

use serde_json::Value;

use crate::record::Record;
use crate::transforms;

/// A named value transform.
///
/// Bare pipeline tokens (`{{x|ucase}}`) invoke the transform with a single
/// argument, the current value. Call-style tokens (`{{x|sprintf("%d", ?)}}`)
/// invoke it with exactly the listed arguments, `?` replaced by the value.
pub type TransformFn = Box<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A `user:` callback: receives the current value, the field name, and the
/// current record; its return value replaces the pipeline value.
pub type CallbackFn = Box<dyn for<'a> Fn(&Value, &str, Record<'a>) -> Value + Send + Sync>;

/// The application object bound to `app:` / `app::` pipeline options.
///
/// Returning `None` from either method leaves the value unchanged.
pub trait AppBinding: Send + Sync {
    /// `app:method` — instance dispatch.
    fn call(&self, method: &str, value: &Value, field: &str, data: Record<'_>) -> Option<Value>;

    /// `app::method` — type-level dispatch. Defaults to instance dispatch.
    fn call_static(
        &self,
        method: &str,
        value: &Value,
        field: &str,
        data: Record<'_>,
    ) -> Option<Value> {
        self.call(method, value, field, data)
    }
}

/// Named transforms and user callbacks available to option pipelines.
///
/// A fresh registry starts with the built-in transforms (`escape`,
/// `urlencode`, `rawurlencode`, `uppercase`, `lowercase`, `int`, `float`,
/// `trim`, `sprintf`) pre-registered; additional names can be added or
/// shadowed freely.
pub struct CallbackRegistry {
    transforms: HashMap<String, TransformFn>,
    callbacks: HashMap<String, CallbackFn>,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    /// Creates a registry with the built-in transforms installed.
    pub fn new() -> Self {
        let mut transforms = HashMap::new();
        transforms::install(&mut transforms);
        Self {
            transforms,
            callbacks: HashMap::new(),
        }
    }

    /// Registers (or shadows) a named transform.
    pub fn register_transform<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.transforms.insert(name.into(), Box::new(transform));
    }

    /// Registers (or shadows) a `user:` callback.
    pub fn register_callback<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: for<'a> Fn(&Value, &str, Record<'a>) -> Value + Send + Sync + 'static,
    {
        self.callbacks.insert(name.into(), Box::new(callback));
    }

    pub(crate) fn transform(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name)
    }

    pub(crate) fn callback(&self, name: &str) -> Option<&CallbackFn> {
        self.callbacks.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_present() {
        let registry = CallbackRegistry::new();
        for name in [
            "escape",
            "urlencode",
            "rawurlencode",
            "uppercase",
            "lowercase",
            "int",
            "float",
            "trim",
            "sprintf",
        ] {
            assert!(registry.transform(name).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn test_register_and_shadow_transform() {
        let mut registry = CallbackRegistry::new();
        registry.register_transform("uppercase", |_args| json!("shadowed"));
        let out = registry.transform("uppercase").unwrap()(&[json!("x")]);
        assert_eq!(out, json!("shadowed"));
    }

    #[test]
    fn test_register_callback() {
        let mut registry = CallbackRegistry::new();
        registry.register_callback("tag", |value, field, _data| {
            json!(format!("{field}={}", value.as_str().unwrap_or_default()))
        });
        let data = json!({});
        let out = registry.callback("tag").unwrap()(&json!("v"), "f", Record::Map(&data));
        assert_eq!(out, json!("f=v"));
        assert!(registry.callback("missing").is_none());
    }
}
