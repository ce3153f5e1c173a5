//! Pipe-option string templating with datapath lookup, nested templates,
//! and streaming repetition.
//!
//! Templates contain `{{field}}` placeholders, optionally followed by a
//! pipe-separated option pipeline that transforms the field's value before
//! it is inserted:
//!
//! ```text
//! <b>{{var1}} {{var2|int|esc}}</b>
//! {{price|sprintf("%1.2f", ?)|default("n/a")}}
//! {{user=profile/name|ucase}}
//! {{rows|each("row-template", "\n")}}
//! ```
//!
//! Values come from a [`serde_json::Value`] record (or any [`DataObject`]
//! implementation for method-bearing records). Rendering is deliberately
//! forgiving: unknown transforms pass the value through unchanged, missing
//! fields and datapath segments render as the empty string. The only hard
//! error is referencing a template name that was never registered.
//!
//! # Example
//!
//! ```rust
//! use fieldloom::Builder;
//! use serde_json::json;
//!
//! let engine = Builder::new().build([
//!     ("greeting", "Hello, {{name|ucase}}!"),
//! ]);
//!
//! let output = engine.render("greeting", &json!({ "name": "world" })).unwrap();
//! assert_eq!(output, "Hello, WORLD!");
//! ```
//!
//! # Repetition and streaming
//!
//! [`Engine::each`] renders a template once per row of a collection, joined
//! by a separator. [`Engine::each_into`] pushes each rendered row into a
//! [`RowSink`] as soon as it is produced, so arbitrarily large collections
//! render in memory bounded by a single row:
//!
//! ```rust
//! use fieldloom::Builder;
//! use serde_json::json;
//!
//! let engine = Builder::new().build([("cell", "{{item}}")]);
//! let rows = json!(["a", "b", "c"]);
//!
//! assert_eq!(engine.each("cell", &rows, ",").unwrap(), "a,b,c");
//!
//! let mut streamed = String::new();
//! engine.each_into("cell", &rows, ",", &mut streamed).unwrap();
//! assert_eq!(streamed, "a,b,c");
//! ```

mod builder;
mod engine;
mod options;
mod parser;
mod record;
mod registry;
mod sink;
mod transforms;

pub use builder::Builder;
pub use engine::Engine;
pub use parser::{Datapath, Fragment, Syntax};
pub use record::{DataObject, Record};
pub use registry::{AppBinding, CallbackRegistry};
pub use sink::RowSink;

use thiserror::Error as ThisError;

/// Errors surfaced by template compilation and rendering.
///
/// Everything else — unknown transforms, missing fields, unresolvable
/// datapath segments, malformed pipeline arguments — degrades to empty or
/// pass-through output instead of erroring, so batch rendering never aborts
/// partway because of one bad row.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A `render` or `each` call referenced a template name that was never
    /// registered, directly or through a nested `render(...)`/`each(...)`
    /// option.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// The delimiter configuration is unusable (an empty open or close
    /// marker).
    #[error("invalid template syntax: {0}")]
    Syntax(String),
}
