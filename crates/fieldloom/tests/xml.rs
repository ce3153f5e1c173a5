//! Datapath lookups over XML parsed with quick-xml's serde support.
//!
//! quick-xml surfaces element attributes as `@`-prefixed keys, so an
//! `@name` datapath segment is an ordinary key lookup once the document is
//! converted to a JSON value.

use fieldloom::Builder;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    #[serde(rename = "A")]
    a: Outer,
}

#[derive(Debug, Serialize, Deserialize)]
struct Outer {
    #[serde(rename = "@status")]
    status: String,
    #[serde(rename = "B")]
    b: Inner,
}

#[derive(Debug, Serialize, Deserialize)]
struct Inner {
    #[serde(rename = "@data-xy")]
    data_xy: String,
}

const XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<xmltest>
<A status="value">
<B data-xy="xyz"/>
</A>
</xmltest>"#;

fn document() -> serde_json::Value {
    let document: Document = quick_xml::de::from_str(XML).unwrap();
    serde_json::to_value(&document).unwrap()
}

#[test]
fn test_absolute_path_to_attribute() {
    let engine = Builder::new().build([("t", "{{var1=/A/@status}}")]);
    assert_eq!(engine.render("t", &document()).unwrap(), "value");
    // Attribute missing from the data: renders empty.
    assert_eq!(engine.render("t", &json!({})).unwrap(), "");
}

#[test]
fn test_relative_path_to_attribute() {
    let engine = Builder::new().build([("t", "{{A=B/@data-xy}}")]);
    assert_eq!(engine.render("t", &document()).unwrap(), "xyz");
}
